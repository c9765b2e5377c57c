use crate::InstanceId;

/// Failures surfaced by the hook engine and by hosts driving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// A hook was called through a session that is not rendering.
    NoActiveSession,
    /// `use_context` was called on an instance bound without a context host.
    ContextUnavailable,
    /// The bound context host speaks a different protocol version.
    UnsupportedContextHost { found: u32, expected: u32 },
    /// `render` was called while the same instance was already rendering.
    ReentrantRender { instance: InstanceId },
    /// `render` was called after the instance unmounted.
    InstanceUnmounted { instance: InstanceId },
    /// A host flush kept scheduling renders past its configured limit.
    RenderLimitExceeded { passes: usize },
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookError::NoActiveSession => write!(
                f,
                "no active render session: hooks may only be called synchronously from a render \
                 function invoked through HookInstance::render (wrap the function with use_hooks)"
            ),
            HookError::ContextUnavailable => write!(
                f,
                "use_context called outside render or on an instance without a context host: \
                 bind one with HostBindings::with_context"
            ),
            HookError::UnsupportedContextHost { found, expected } => write!(
                f,
                "unsupported context host: protocol version {found}, expected {expected}"
            ),
            HookError::ReentrantRender { instance } => {
                write!(f, "instance {instance} is already rendering")
            }
            HookError::InstanceUnmounted { instance } => {
                write!(f, "instance {instance} has been unmounted")
            }
            HookError::RenderLimitExceeded { passes } => {
                write!(f, "re-render requests did not settle after {passes} passes")
            }
        }
    }
}

impl std::error::Error for HookError {}
