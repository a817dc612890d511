//! Unit traits
//!
//! A unit participates in the graph by implementing [`Assemblage`]: it names
//! the interface it is registered under, declares its definition and
//! dependency identifiers, and constructs itself from a [`BuildContext`].
//! The object-safe [`Lifecycle`] supertrait carries the optional async
//! hooks the orchestrator drives around construction and teardown.

use crate::context::{AssemblerContext, BuildContext};
use crate::definition::{Configuration, Definition};
use crate::error::Result;
use crate::identifier::Identifier;
use async_trait::async_trait;
use std::sync::Arc;

/// Optional lifecycle hooks, invoked by the orchestrator.
///
/// Every hook has a silent default; a unit overrides only what it needs.
/// Hooks may be synchronous bodies (the returned future is immediately
/// ready) or genuinely asynchronous; the orchestrator awaits each hook
/// before moving on, which is what makes the documented ordering total.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Called once per constructed instance, dependencies first, after the
    /// whole tree has been built.
    async fn on_init(&self, _context: &AssemblerContext, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }

    /// Called after every `on_init` has completed, in reverse order.
    async fn on_inited(&self, _context: &AssemblerContext, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }

    /// Called during container disposal, dependents before dependencies.
    async fn on_dispose(&self, _context: &AssemblerContext, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }
}

/// A unit of the dependency graph.
///
/// `Interface` is the identifier type this unit is registered under: `Self`
/// for a plain unit, or a `dyn Trait` object type to bind an abstraction to
/// this concrete. `as_interface` performs the unsizing coercion at a point
/// where both types are known.
///
/// ```rust
/// use assemblage::prelude::*;
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct EnglishGreeter;
///
/// impl Greeter for EnglishGreeter {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// #[async_trait]
/// impl Lifecycle for EnglishGreeter {}
///
/// impl Assemblage for EnglishGreeter {
///     type Interface = dyn Greeter;
///
///     fn assemble(_ctx: &BuildContext) -> Result<Self> {
///         Ok(EnglishGreeter)
///     }
///
///     fn as_interface(this: Arc<Self>) -> Arc<dyn Greeter> {
///         this
///     }
/// }
/// ```
pub trait Assemblage: Lifecycle + Sized + 'static {
    /// The identifier type this unit is registered under.
    type Interface: ?Sized + Send + Sync + 'static;

    /// The unit's definition. Defaults to an empty singleton definition.
    fn definition() -> Definition {
        Definition::new()
    }

    /// Identifiers of the constructor dependencies this unit requires.
    ///
    /// The list feeds cycle detection and diagnostics; it should mirror the
    /// `require` calls made in [`Assemblage::assemble`]. The
    /// [`identifiers!`](crate::identifiers) macro builds it.
    fn dependencies() -> Vec<Identifier> {
        Vec::new()
    }

    /// Construct the unit, pulling dependencies and decorated values from
    /// the build context.
    fn assemble(ctx: &BuildContext) -> Result<Self>;

    /// Coerce a shared instance to the registered interface.
    ///
    /// For `type Interface = Self` the body is just `this`.
    fn as_interface(this: Arc<Self>) -> Arc<Self::Interface>;

    /// Class-level hook invoked when the unit is registered, before any
    /// construction. Failures abort the build.
    fn on_register(_context: &AssemblerContext, _configuration: &Configuration) -> Result<()> {
        Ok(())
    }
}
