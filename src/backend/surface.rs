// Window surface - binds a native window to the instance
//
// The window itself belongs to the windowing layer; only the surface is owned here.

use super::api::InstanceApi;
use super::error::{BootstrapError, Result};
use super::instance::InstanceContext;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

#[derive(Debug)]
pub struct SurfaceBinding {
    surface: vk::SurfaceKHR,
}

impl SurfaceBinding {
    /// Create the platform surface for a native display/window handle pair.
    pub fn new(
        instance: &InstanceContext,
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
    ) -> Result<Self> {
        let surface = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.instance,
                display_handle,
                window_handle,
                None,
            )
        }
        .map_err(|err| {
            log::error!("Error occurred during window surface creation: {}", err);
            BootstrapError::SurfaceCreationFailed(err)
        })?;

        log::info!("Window surface created");
        Ok(Self { surface })
    }

    /// Take ownership of a surface created elsewhere.
    pub fn from_raw(surface: vk::SurfaceKHR) -> Self {
        Self { surface }
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn destroy<I: InstanceApi>(self, instance: &I) {
        instance.destroy_surface(self.surface);
    }
}
