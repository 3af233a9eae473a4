// ============================================================
// Layer 6 — Compute Device Selection
// ============================================================
// All tensors live on one wgpu device chosen at startup.
//   auto → the best adapter wgpu finds (discrete GPU first,
//          falling back to integrated, virtual, then CPU)
//   cpu  → wgpu's CPU adapter
//   gpu  → a specific discrete GPU index

use burn::backend::wgpu::WgpuDevice;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    #[default]
    Auto,
    Cpu,
    Gpu(usize),
}

pub fn select_device(choice: DeviceChoice) -> WgpuDevice {
    let device = match choice {
        DeviceChoice::Auto     => WgpuDevice::default(),
        DeviceChoice::Cpu      => WgpuDevice::Cpu,
        DeviceChoice::Gpu(idx) => WgpuDevice::DiscreteGpu(idx),
    };
    match device {
        WgpuDevice::Cpu => println!("Using CPU"),
        ref other       => println!("Using device: {:?}", other),
    }
    device
}
