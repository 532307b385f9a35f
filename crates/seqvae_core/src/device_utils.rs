use candle_core::Device;
use tracing::{info, warn};

/// Pick the compute device. CUDA device 0 when built with `cuda` and present,
/// otherwise the CPU. `cpu_only` skips the probe entirely.
pub fn select_device(cpu_only: bool) -> Device {
    if cpu_only {
        info!("Using CPU (requested)");
        return Device::Cpu;
    }
    match Device::cuda_if_available(0) {
        Ok(Device::Cpu) => {
            info!("Using CPU");
            Device::Cpu
        }
        Ok(device) => {
            info!("Using CUDA device 0");
            device
        }
        Err(e) => {
            warn!("Failed to initialize CUDA device 0: {}. Falling back to CPU", e);
            Device::Cpu
        }
    }
}
