// =============================================================================
// VULKAN BOOTSTRAP - Demo driver
// =============================================================================
//
// Opens a window and brings up everything needed to present to it, without
// rendering anything.
//
// BOOTSTRAP FLOW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  InstanceContext (library, instance, debug messenger)           │
// │    └── SurfaceBinding (window surface)                          │
// │          └── DeviceHandle                                       │
// │                ├── physical device (scored selection)           │
// │                ├── logical device + graphics/present queues     │
// │                └── swapchain + frame semaphores                 │
// └─────────────────────────────────────────────────────────────────┘
//
// On resize the swapchain is recreated. A minimized window has no swapchain
// until it is restored.
//
// =============================================================================

use anyhow::{Context, Result};
use ash::vk;
use gfx_bootstrap::backend::{DeviceHandle, InstanceContext, PresentState, SurfaceBinding, SwapchainNegotiator};
use gfx_bootstrap::config::Config;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting Vulkan bootstrap");
    log::info!("Window: {}x{}", config.window.width, config.window.height);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Level from config, RUST_LOG still wins
fn init_logging(config: &Config) {
    use env_logger::Builder;

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_default_env();
    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    window: Option<Window>,
    instance: Option<Arc<InstanceContext>>,
    device: Option<DeviceHandle<InstanceContext>>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            instance: None,
            device: None,
        }
    }

    fn init_vulkan(&mut self, window: &Window) -> Result<()> {
        // Anything fallible in the config goes before the surface exists
        let selector = self.config.device_selector()?;
        let negotiator = SwapchainNegotiator::new(self.config.fallback_extent());

        let display_handle = window.raw_display_handle();

        let instance = Arc::new(
            InstanceContext::new(
                &self.config.window.title,
                display_handle,
                self.config.debug.validation_layers,
            )
            .context("Failed to create Vulkan instance")?,
        );
        self.instance = Some(Arc::clone(&instance));

        let surface = SurfaceBinding::new(&instance, display_handle, window.raw_window_handle())
            .context("Failed to create window surface")?;

        let device = DeviceHandle::bootstrap(instance, surface, &selector, negotiator).map_err(|err| {
            if err.is_recoverable() {
                log::warn!("No usable GPU on this machine: {}", err);
            }
            err
        })?;
        device.print_name();
        self.device = Some(device);

        log::info!("Vulkan bootstrap complete");
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };

        device.set_fallback_extent(vk::Extent2D { width, height });
        match device.recreate_swapchain().context("Failed to recreate swapchain")? {
            PresentState::Ready => log::debug!("Swapchain recreated at {}x{}", width, height),
            PresentState::NotPresentable(_) => log::debug!("Window minimized, swapchain kept"),
        }
        Ok(())
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_vulkan(&window) {
            log::error!("Failed to initialize Vulkan: {:?}", e);
            event_loop.exit();
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);

                if let Err(e) = self.resize(size.width, size.height) {
                    log::error!("{:?}", e);
                    event_loop.exit();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");

        // Device handle first: it releases the surface and its instance reference
        if let Some(device) = self.device.take() {
            device.destroy();
        }

        // Last reference, destroys the instance
        self.instance.take();

        log::info!("Cleanup complete");
    }
}
