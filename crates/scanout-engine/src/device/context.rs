use super::{ApiProfile, ContextId, ContextParams, PlatformError, RenderPlatform};

/// Process-wide rendering context.
///
/// Owns the platform, the opened display, the selected configuration and the
/// shared context every per-console context is created against.
///
/// Single-initialization contract: built once by
/// [`select_and_open`](super::select_and_open) before any scanout pipeline
/// exists, handed to listeners by `Rc`, and only dropped at shutdown. It is
/// `!Send`; every call must come from the thread that created it.
pub struct RenderContext<P: RenderPlatform> {
    platform: P,
    display: P::Display,
    config: P::Config,
    profile: ApiProfile,
    shared: ContextId,
}

impl<P: RenderPlatform> RenderContext<P> {
    pub(crate) fn new(
        platform: P,
        display: P::Display,
        config: P::Config,
        profile: ApiProfile,
        shared: ContextId,
    ) -> Self {
        Self {
            platform,
            display,
            config,
            profile,
            shared,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn display(&self) -> &P::Display {
        &self.display
    }

    pub fn config(&self) -> &P::Config {
        &self.config
    }

    /// Profile resolved during initialization.
    pub fn profile(&self) -> ApiProfile {
        self.profile
    }

    /// The shared context created at startup.
    pub fn shared_context(&self) -> ContextId {
        self.shared
    }

    /// Creates a context for a console.
    ///
    /// The shared context is made current first so the new context shares
    /// objects with it and inherits the negotiated profile and config.
    pub fn create_context_for_console(
        &self,
        params: &ContextParams,
    ) -> Result<ContextId, PlatformError> {
        self.platform.make_current(&self.display, Some(self.shared))?;
        let share = self.platform.current_context();
        let ctx = self.platform.create_context(
            &self.display,
            &self.config,
            self.profile,
            share,
            params,
        )?;
        log::debug!(
            "created context {:?} ({} {}.{}) sharing with {:?}",
            ctx,
            self.profile,
            params.major_ver,
            params.minor_ver,
            share
        );
        Ok(ctx)
    }

    pub fn destroy_context(&self, context: ContextId) {
        if context == self.shared {
            log::warn!("refusing to destroy the shared context {context:?}");
            return;
        }
        self.platform.destroy_context(&self.display, context);
    }

    pub fn make_current(&self, context: Option<ContextId>) -> Result<(), PlatformError> {
        self.platform.make_current(&self.display, context)
    }

    pub fn current_context(&self) -> Option<ContextId> {
        self.platform.current_context()
    }
}
