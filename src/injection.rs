//! Injection declarations and their canonical form
//!
//! User definitions declare contributions as [`Injection`] values. At
//! registration time each injection is resolved into a [`Buildable`]: the
//! canonical `(identifier, concrete, configuration, instance?)` record the
//! registry stores. Expansion is deliberately lazy so mutually-injecting
//! units do not recurse while their definitions are being described — the
//! registry's presence check is what terminates the walk.

use crate::assemblage::{Assemblage, Lifecycle};
use crate::context::BuildContext;
use crate::definition::{Configuration, Definition};
use crate::error::Result;
use crate::identifier::Identifier;
use std::any::{Any, TypeId};
use std::sync::Arc;

pub(crate) type ConstructFn = fn(&BuildContext) -> Result<ErasedInstance>;
pub(crate) type RegisterHookFn =
    fn(&crate::context::AssemblerContext, &Configuration) -> Result<()>;

/// A constructed unit with its typing erased.
///
/// Holds the instance twice: once as the registered interface (boxed inside
/// `dyn Any` so `Arc<I>` survives erasure even for unsized `I`) and once as
/// a lifecycle handle for hook dispatch.
#[derive(Clone)]
pub(crate) struct ErasedInstance {
    erased: Arc<dyn Any + Send + Sync>,
    lifecycle: Arc<dyn Lifecycle>,
    concrete_name: &'static str,
}

impl ErasedInstance {
    pub fn new<I: ?Sized + Send + Sync + 'static>(
        interface: Arc<I>,
        lifecycle: Arc<dyn Lifecycle>,
        concrete_name: &'static str,
    ) -> Self {
        Self {
            erased: Arc::new(interface),
            lifecycle,
            concrete_name,
        }
    }

    /// Recover the typed interface handle. `None` on identifier mismatch,
    /// which the container treats as an internal error.
    pub fn downcast<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.erased.downcast_ref::<Arc<I>>().cloned()
    }

    pub fn lifecycle(&self) -> Arc<dyn Lifecycle> {
        Arc::clone(&self.lifecycle)
    }
}

impl std::fmt::Debug for ErasedInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedInstance")
            .field("concrete", &self.concrete_name)
            .finish()
    }
}

/// A `use` entry in a definition: either a value bound under a string key
/// or a pre-built instance bound to its interface identifier.
#[derive(Clone)]
pub(crate) enum UseBinding {
    Value {
        key: String,
        value: Arc<dyn Any + Send + Sync>,
    },
    Instance(Injection),
}

/// The deferred, type-dependent parts of an injection.
pub(crate) struct Expanded {
    pub definition: Definition,
    pub dependencies: Vec<Identifier>,
    pub construct: ConstructFn,
    pub register_hook: RegisterHookFn,
}

fn expand_unit<C: Assemblage>() -> Expanded {
    Expanded {
        definition: C::definition(),
        dependencies: C::dependencies(),
        construct: construct_unit::<C>,
        register_hook: C::on_register,
    }
}

fn construct_unit<C: Assemblage>(ctx: &BuildContext) -> Result<ErasedInstance> {
    let unit = Arc::new(C::assemble(ctx)?);
    let lifecycle: Arc<dyn Lifecycle> = Arc::clone(&unit) as Arc<dyn Lifecycle>;
    Ok(ErasedInstance::new::<C::Interface>(
        C::as_interface(unit),
        lifecycle,
        std::any::type_name::<C>(),
    ))
}

/// A declared registration contribution.
///
/// The canonical tuple grammar maps onto two constructors: the unit's
/// `Interface` association covers both the one-element and the
/// abstract-binding shapes, and a trailing configuration object is the
/// explicit [`Injection::with_config`] form.
///
/// ```rust
/// use assemblage::{Definition, Injection};
/// # use assemblage::prelude::*;
/// # use std::sync::Arc;
/// # struct Logger;
/// # #[async_trait]
/// # impl Lifecycle for Logger {}
/// # impl Assemblage for Logger {
/// #     type Interface = Logger;
/// #     fn assemble(_ctx: &BuildContext) -> Result<Self> { Ok(Logger) }
/// #     fn as_interface(this: Arc<Self>) -> Arc<Self> { this }
/// # }
///
/// let definition = Definition::new().inject(Injection::of::<Logger>());
/// # let _ = definition;
/// ```
#[derive(Clone)]
pub struct Injection {
    pub(crate) identifier: Identifier,
    pub(crate) concrete_id: TypeId,
    pub(crate) concrete_name: &'static str,
    pub(crate) configuration: Option<Configuration>,
    pub(crate) instance: Option<ErasedInstance>,
    expand: fn() -> Expanded,
}

impl Injection {
    /// Declare a unit under its interface identifier.
    pub fn of<C: Assemblage>() -> Self {
        Self {
            identifier: Identifier::of::<C::Interface>(),
            concrete_id: TypeId::of::<C>(),
            concrete_name: std::any::type_name::<C>(),
            configuration: None,
            instance: None,
            expand: expand_unit::<C>,
        }
    }

    /// Declare a unit with a registered configuration.
    pub fn with_config<C: Assemblage>(configuration: Configuration) -> Self {
        Self {
            configuration: Some(configuration),
            ..Self::of::<C>()
        }
    }

    /// Bind a pre-built instance to its interface identifier. The instance
    /// is returned as-is on every require; construction, the init queue and
    /// lifecycle hooks are skipped.
    pub fn instance<C: Assemblage>(instance: Arc<C>) -> Self {
        let lifecycle: Arc<dyn Lifecycle> = Arc::clone(&instance) as Arc<dyn Lifecycle>;
        let erased = ErasedInstance::new::<C::Interface>(
            C::as_interface(instance),
            lifecycle,
            std::any::type_name::<C>(),
        );
        Self {
            instance: Some(erased),
            ..Self::of::<C>()
        }
    }

    /// The identifier this injection registers under.
    #[inline]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Resolve the injection into its canonical form, running the unit's
    /// definition and normalization.
    pub(crate) fn resolve(&self) -> Result<Buildable> {
        let expanded = (self.expand)();
        Ok(Buildable {
            identifier: self.identifier.clone(),
            concrete_id: self.concrete_id,
            concrete_name: self.concrete_name,
            configuration: self.configuration.clone(),
            definition: expanded.definition.normalized()?,
            dependencies: expanded.dependencies,
            construct: expanded.construct,
            register_hook: expanded.register_hook,
            instance: self.instance.clone(),
        })
    }
}

impl std::fmt::Debug for Injection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injection")
            .field("identifier", &self.identifier)
            .field("concrete", &self.concrete_name)
            .field("instance", &self.instance.is_some())
            .finish()
    }
}

/// Canonical record produced from an [`Injection`] at registration time.
///
/// `concrete` is always constructible; `identifier` may name a distinct
/// abstraction. `instance` is only set on the instance-binding path.
pub(crate) struct Buildable {
    pub identifier: Identifier,
    pub concrete_id: TypeId,
    pub concrete_name: &'static str,
    pub configuration: Option<Configuration>,
    pub definition: Definition,
    pub dependencies: Vec<Identifier>,
    pub construct: ConstructFn,
    pub register_hook: RegisterHookFn,
    pub instance: Option<ErasedInstance>,
}
