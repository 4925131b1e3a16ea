//! # Explicitly destroyed resources.
//!
//! A [`Resource`] is what a successful render leaves behind: a live rendering
//! context that is not reclaimed by dropping it. The scheduler owns every
//! produced handle and calls [`Resource::destroy`] exactly once.

use crate::error::ResourceError;

/// Owned handle to a live resource.
pub type ResourceHandle = Box<dyn Resource>;

/// A rendering context (or anything else) that must be torn down explicitly.
///
/// `destroy` should release every owned sub-resource (children, textures,
/// base textures). It is called at most once per handle; an error is logged
/// by the scheduler and the registry entry is removed regardless.
///
/// # Example
/// ```
/// use ctxvisor::{Resource, ResourceError};
///
/// struct GlContext { id: u32 }
///
/// impl Resource for GlContext {
///     fn destroy(&mut self) -> Result<(), ResourceError> {
///         // release textures, lose context...
///         Ok(())
///     }
/// }
/// ```
pub trait Resource: Send + 'static {
    /// Releases the resource and everything it owns.
    fn destroy(&mut self) -> Result<(), ResourceError>;
}
