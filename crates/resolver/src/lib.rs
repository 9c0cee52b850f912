//! Hierarchical, cached, policy-driven symbol resolution.
//!
//! Resolution nodes form a tree in which each node knows only its parent.
//! A node resolves a name from its cache, its own roots or its parent,
//! depending on the [`ReservedNamespace`] and its [`Policy`], and caches every
//! success. New nodes seed their cache from what the host has already
//! resolved along their ancestor chain (see [`seed_from_ancestors`]), so
//! siblings created under a common parent share one instance per name.
//!
//! - [`ResolutionNode`]: the full node with roots, policy and forks
//! - [`CachingResolver`]: flat variant that trusts its parent for everything
//! - [`Instrumentation`]: what the host reports about resolved symbols
//! - [`ResolverConfig`]: TOML configuration for nodes

mod cache;
mod config;
mod error;
mod flat;
mod instrument;
mod locator;
mod node;
mod policy;
mod resolve;
mod seed;
mod symbol;

pub use cache::SymbolCache;
pub use config::{ResolverConfig, RootConfig};
pub use error::{ConfigError, ResolveError, Result};
pub use flat::CachingResolver;
pub use instrument::{Instrumentation, NoInstrumentation, ResolutionTracker};
pub use locator::{DEFAULT_UNIT_EXTENSION, DirLocator, Locator, MapLocator, Root};
pub use node::{NodeBuilder, ResolutionNode};
pub use policy::{DEFAULT_RESERVED_PREFIXES, Policy, ReservedNamespace};
pub use resolve::{ParentRef, Resolve};
pub use seed::seed_from_ancestors;
pub use symbol::{NodeId, Symbol, SymbolOrigin, SymbolRef};
