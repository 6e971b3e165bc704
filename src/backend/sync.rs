// Synchronization primitives
//
// Created and destroyed here, signaled and waited on by a frame loop.

use super::api::DeviceApi;
use super::error::Result;
use ash::vk;

/// Semaphore pair for acquire -> render -> present.
#[derive(Debug)]
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
}

impl FrameSync {
    pub fn new<D: DeviceApi>(device: &D) -> Result<Self> {
        let image_available = device.create_semaphore()?;
        let render_finished = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(err) => {
                device.destroy_semaphore(image_available);
                return Err(err);
            }
        };

        Ok(Self {
            image_available,
            render_finished,
        })
    }

    pub fn destroy<D: DeviceApi>(self, device: &D) {
        device.destroy_semaphore(self.image_available);
        device.destroy_semaphore(self.render_finished);
    }
}
