//! Plane Registration Example
//!
//! Fits a kernel deformation that carries a flat point grid onto a bent copy
//! of itself, then reports the recovered distance.
//!
//! Usage:
//!   cargo run --example plane_registration

use burn::backend::Autodiff;
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::NdArray;
use rshapes_core::PolyData;
use rshapes_model::KernelDeformationConfig;
use rshapes_registration::optimizer::LbfgsConfig;
use rshapes_registration::{L2Loss, Loss, OptimizerConfig, Registration, RegistrationConfig};

type Backend = Autodiff<NdArray<f32>>;

fn main() -> anyhow::Result<()> {
    println!("rshapes Plane Registration");
    println!("==========================\n");

    tracing_subscriber::fmt().with_env_filter("info").init();

    let device = Default::default();

    // 1. Build the shapes: a flat 5x5 grid and a sine-bent copy.
    let n = 5usize;
    let mut flat = Vec::with_capacity(n * n * 3);
    let mut bent = Vec::with_capacity(n * n * 3);
    for i in 0..n {
        for j in 0..n {
            let x = i as f32 / (n - 1) as f32;
            let y = j as f32 / (n - 1) as f32;
            flat.extend([x, y, 0.0]);
            bent.extend([x, y, 0.3 * (std::f32::consts::PI * x).sin()]);
        }
    }
    let source: PolyData<Backend> =
        PolyData::new(Tensor::from_data(TensorData::new(flat, [n * n, 3]), &device))?;
    let target: PolyData<Backend> =
        PolyData::new(Tensor::from_data(TensorData::new(bent, [n * n, 3]), &device))?;
    println!("Source: {} points in {}D", source.n_points(), source.dim());

    let initial: f32 = L2Loss::new().forward(&source, &target)?.into_scalar();
    println!("Initial L2 distance: {initial:.4}\n");

    // 2. Configure the registration.
    let model = KernelDeformationConfig::new()
        .with_sigma(0.4)
        .with_n_steps(3)
        .init()?;
    let config = RegistrationConfig::new()
        .with_optimizer(OptimizerConfig::Lbfgs(LbfgsConfig::new()))
        .with_regularization(0.1)
        .with_n_iter(20)
        .with_verbose(true);
    let mut registration = Registration::<Backend, _, _>::new(model, L2Loss::new(), config)?;

    // 3. Fit and transform.
    println!("Fitting...");
    let morphed = registration.fit_transform(&source, &target)?;

    let distance: f32 = registration.distance()?.into_scalar();
    let residual: f32 = L2Loss::new().forward(&morphed, &target)?.into_scalar();
    println!("\nDeformation energy: {distance:.4}");
    println!("Residual L2 distance: {residual:.4}");
    println!(
        "Reduction: {:.1}%",
        100.0 * (1.0 - residual / initial)
    );

    Ok(())
}
