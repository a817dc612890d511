//! # Assemblage - Metadata-Driven Dependency Injection for Rust
//!
//! A dependency-injection runtime that composes an application from a root
//! unit by recursively resolving declared dependencies, managing their
//! lifetimes and driving a deterministic lifecycle around construction and
//! teardown.
//!
//! ## Features
//!
//! - 🧩 **Declarative graphs** - Units describe their contributions in a
//!   [`Definition`]; the container registers the whole tree from the root
//! - 🔒 **Type-safe resolution** - Identifiers are interface types, concrete
//!   structs or `dyn Trait` abstractions bound to a concrete
//! - ♻️ **Singleton & transient lifetimes** - Shared by default, fresh per
//!   require on request; the root is always shared
//! - 🪝 **Ordered lifecycle hooks** - `on_register`, `on_init`, `on_inited`
//!   and `on_dispose` run in a documented, reproducible order, sync or async
//! - 📡 **Event forwarding** - Per-unit channels are re-emitted on the
//!   container so any unit can observe any other
//! - 🏷️ **Tags, keyed values and globals** - Query units by tag, bind plain
//!   values under string keys, share cross-cutting globals
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty
//!   output; cycle reporting with a zero-overhead default
//!
//! ## Quick Start
//!
//! ```rust
//! use assemblage::prelude::*;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[async_trait]
//! impl Lifecycle for Database {}
//!
//! impl Assemblage for Database {
//!     type Interface = Database;
//!
//!     fn assemble(_ctx: &BuildContext) -> Result<Self> {
//!         Ok(Database {
//!             url: "postgres://localhost".into(),
//!         })
//!     }
//!
//!     fn as_interface(this: Arc<Self>) -> Arc<Self> {
//!         this
//!     }
//! }
//!
//! struct App {
//!     database: Arc<Database>,
//! }
//!
//! #[async_trait]
//! impl Lifecycle for App {}
//!
//! impl Assemblage for App {
//!     type Interface = App;
//!
//!     fn definition() -> Definition {
//!         Definition::new().inject(Injection::of::<Database>())
//!     }
//!
//!     fn dependencies() -> Vec<Identifier> {
//!         identifiers![Database]
//!     }
//!
//!     fn assemble(ctx: &BuildContext) -> Result<Self> {
//!         Ok(App {
//!             database: ctx.require::<Database>()?,
//!         })
//!     }
//!
//!     fn as_interface(this: Arc<Self>) -> Arc<Self> {
//!         this
//!     }
//! }
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .build()
//!     .unwrap();
//! runtime.block_on(async {
//!     let assembler = Assembler::new();
//!     let app = assembler.build::<App>(None).await.unwrap();
//!     assert_eq!(app.database.url, "postgres://localhost");
//!     assembler.dispose().await;
//! });
//! ```
//!
//! ## Abstract Bindings
//!
//! An abstraction is a `dyn Trait` used as the registration identifier; the
//! unit names it as its `Interface` and the unsizing coercion lives in
//! `as_interface`, where both types are known:
//!
//! ```rust,ignore
//! impl Assemblage for ConsoleLogger {
//!     type Interface = dyn Logger;
//!     // ...
//!     fn as_interface(this: Arc<Self>) -> Arc<dyn Logger> {
//!         this
//!     }
//! }
//! ```
//!
//! ## Lifecycle Ordering
//!
//! For a dependency `D` of a parent `P` the orchestrator guarantees:
//!
//! ```text
//! D.on_register < P.on_register < D.construct < P.construct
//!   < D.on_init < P.on_init < P.on_dispose < D.on_dispose
//! ```
//!
//! Hooks are awaited sequentially; a synchronous hook body is simply a
//! future that is already ready. Everything is single-threaded cooperative:
//! the container performs no I/O and suspends only inside user hooks.
//!
//! ## Cycles
//!
//! Cyclic graphs are reported, never broken: the resolve path fails with
//! the offending path on the first cyclic require, and the opt-in
//! [`set_cycle_detection`] walk logs every cycle during the build's
//! detection phase.

mod assemblage;
mod build;
mod container;
mod context;
mod cycles;
mod definition;
mod error;
mod events;
mod identifier;
mod injection;
#[cfg(feature = "logging")]
pub mod logging;
pub mod metadata;
mod objects;
mod registry;
mod strategy;

pub use assemblage::{Assemblage, Lifecycle};
pub use container::{Assembler, Tagged};
pub use context::{AssemblerContext, BuildContext, Disposer};
pub use cycles::{
    ActiveCycleDetector, Cycle, CycleDetection, NoOpCycleDetector, cycle_detection_enabled,
    set_cycle_detection,
};
pub use definition::{Configuration, Definition};
pub use error::{AssemblerError, Result};
pub use events::{Event, EventBus, ListenerId, Payload, WILDCARD};
pub use identifier::Identifier;
pub use injection::Injection;

// Implementations of `Lifecycle` need the attribute; re-exported so callers
// depend on one crate only.
pub use async_trait::async_trait;

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Build a dependency identifier list from interface types.
///
/// ```rust
/// use assemblage::{Identifier, identifiers};
///
/// trait Port: Send + Sync {}
/// struct Adapter;
///
/// let dependencies = identifiers![Adapter, dyn Port];
/// assert_eq!(dependencies.len(), 2);
/// assert_eq!(dependencies[0], Identifier::of::<Adapter>());
/// ```
#[macro_export]
macro_rules! identifiers {
    ($($interface:ty),* $(,)?) => {
        vec![$($crate::Identifier::of::<$interface>()),*]
    };
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Assemblage, Assembler, AssemblerContext, AssemblerError, BuildContext, Configuration,
        Definition, Disposer, Event, EventBus, Identifier, Injection, Lifecycle, ListenerId,
        Result, async_trait, identifiers,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    struct Clock;

    impl Clock {
        fn now(&self) -> u64 {
            42
        }
    }

    #[async_trait]
    impl Lifecycle for Clock {}

    impl Assemblage for Clock {
        type Interface = Clock;

        fn definition() -> Definition {
            Definition::new().tag("infra")
        }

        fn assemble(_ctx: &BuildContext) -> Result<Self> {
            Ok(Clock)
        }

        fn as_interface(this: Arc<Self>) -> Arc<Self> {
            this
        }
    }

    struct Stamped {
        clock: Arc<Clock>,
    }

    #[async_trait]
    impl Lifecycle for Stamped {}

    impl Assemblage for Stamped {
        type Interface = Stamped;

        fn definition() -> Definition {
            Definition::new().inject(Injection::of::<Clock>())
        }

        fn dependencies() -> Vec<Identifier> {
            identifiers![Clock]
        }

        fn assemble(ctx: &BuildContext) -> Result<Self> {
            Ok(Stamped {
                clock: ctx.require::<Clock>()?,
            })
        }

        fn as_interface(this: Arc<Self>) -> Arc<Self> {
            this
        }
    }

    #[tokio::test]
    async fn test_build_and_query_surface() {
        let assembler = Assembler::new();
        let app = assembler.build::<Stamped>(None).await.unwrap();

        assert_eq!(app.clock.now(), 42);
        assert!(assembler.has::<Clock>());
        assert!(assembler.has::<Stamped>());
        assert_eq!(assembler.len(), 2);
        assert_eq!(assembler.tagged(&["infra"]).unwrap().len(), 1);

        // Registered singletons resolve to the same reference.
        let again = assembler.require::<Clock>().unwrap();
        assert!(Arc::ptr_eq(&app.clock, &again));
    }

    #[tokio::test]
    async fn test_registration_records_metadata() {
        let assembler = Assembler::new();
        let _app = assembler.build::<Stamped>(None).await.unwrap();

        assert!(crate::metadata::is_unit::<Clock>());
        let definition = crate::metadata::definition_of::<Clock>().unwrap();
        assert_eq!(definition["singleton"], serde_json::json!(true));
        assert_eq!(definition["tags"], serde_json::json!(["infra"]));

        let root = crate::metadata::definition_of::<Stamped>().unwrap();
        let dependencies = root["dependencies"].as_array().unwrap();
        assert!(dependencies[0].as_str().unwrap().contains("Clock"));
    }
}
