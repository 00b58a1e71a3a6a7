// ============================================================
// Layer 6 — Compute Backend
// ============================================================
// With the `wgpu` feature (default) inference runs on the best
// adapter wgpu finds, discrete GPU first, falling back to its CPU
// adapter. Without it the NdArray CPU backend is used.

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

pub type InferDevice = <InferBackend as burn::tensor::backend::Backend>::Device;

/// Pick the device for this run. Never fails.
pub fn select_device() -> InferDevice {
    #[cfg(feature = "wgpu")]
    let device = burn::backend::wgpu::WgpuDevice::BestAvailable;

    #[cfg(not(feature = "wgpu"))]
    let device = burn::backend::ndarray::NdArrayDevice::Cpu;

    tracing::info!("Using device: {:?}", device);
    device
}
