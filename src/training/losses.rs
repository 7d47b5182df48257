//! Loss functions for WGAN-GP training
//!
//! Implements the Wasserstein critic/generator losses and the gradient
//! penalty that keeps the critic approximately 1-Lipschitz.

use tch::{Kind, Tensor};

/// Wasserstein loss for the generator
///
/// Generator loss: -E[C(G(z))]
pub fn generator_loss(fake_scores: &Tensor) -> Tensor {
    -fake_scores.mean(Kind::Float)
}

/// Wasserstein loss for the critic, without the penalty term
///
/// Critic loss: E[C(G(z))] - E[C(x)]
pub fn critic_loss(real_scores: &Tensor, fake_scores: &Tensor) -> Tensor {
    fake_scores.mean(Kind::Float) - real_scores.mean(Kind::Float)
}

/// Gradient penalty along random real/fake interpolations
///
/// For every sample an independent `alpha ~ U[0, 1]` mixes
/// `alpha * real + (1 - alpha) * fake`. The critic is evaluated on the
/// mixed batch, its gradient with respect to the mixed input is taken with
/// `create_graph` set, and the penalty is the batch mean of
/// `(||grad||_2 - 1)^2`. The result stays attached to the critic's
/// parameters, so backpropagating through it is a second-order pass.
///
/// # Arguments
///
/// * `critic` - Scoring function returning one value per sample
/// * `real` - Real batch of shape (batch_size, ...)
/// * `fake` - Fake batch with the same shape as `real`
pub fn gradient_penalty<F>(critic: F, real: &Tensor, fake: &Tensor) -> Tensor
where
    F: Fn(&Tensor) -> Tensor,
{
    let batch_size = real.size()[0];
    let mut alpha_shape = vec![1i64; real.dim()];
    alpha_shape[0] = batch_size;

    let alpha = Tensor::rand(alpha_shape.as_slice(), (Kind::Float, real.device()));
    let beta = -&alpha + 1.0;
    let interpolates = (&alpha * real.detach() + beta * fake.detach())
        .detach()
        .set_requires_grad(true);

    let scores = critic(&interpolates);
    let gradients = Tensor::run_backward(&[scores.sum(Kind::Float)], &[&interpolates], true, true)
        .remove(0);

    let norms = gradients
        .view([batch_size, -1])
        .norm_scalaropt_dim(2.0, [1], false);
    (norms - 1.0).square().mean(Kind::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    fn batch(n: i64) -> (Tensor, Tensor) {
        let real = Tensor::randn([n, 3, 8, 8], (Kind::Float, Device::Cpu));
        let fake = Tensor::randn([n, 3, 8, 8], (Kind::Float, Device::Cpu));
        (real, fake)
    }

    /// Linear critic whose input gradient is `scale / sqrt(D)` in every coordinate
    fn linear_critic(scale: f64) -> impl Fn(&Tensor) -> Tensor {
        move |x: &Tensor| {
            let n = x.size()[0];
            let flat = x.view([n, -1]);
            let d = flat.size()[1] as f64;
            flat.sum_dim_intlist([1].as_slice(), false, Kind::Float) * (scale / d.sqrt())
        }
    }

    #[test]
    fn test_wasserstein_losses() {
        let real = Tensor::from_slice(&[3.0f32, 5.0]);
        let fake = Tensor::from_slice(&[1.0f32, -1.0]);

        assert_eq!(critic_loss(&real, &fake).double_value(&[]), -4.0);
        assert_eq!(generator_loss(&fake).double_value(&[]), 0.0);
        assert_eq!(generator_loss(&real).double_value(&[]), -4.0);
    }

    #[test]
    fn test_penalty_zero_for_unit_gradient() {
        let (real, fake) = batch(4);
        let gp = gradient_penalty(linear_critic(1.0), &real, &fake);

        assert_eq!(gp.size(), Vec::<i64>::new());
        assert!(gp.double_value(&[]).abs() < 1e-6);
    }

    #[test]
    fn test_penalty_for_known_gradient_norm() {
        let (real, fake) = batch(3);

        // ||grad|| = 3 everywhere -> (3 - 1)^2 = 4
        let gp = gradient_penalty(linear_critic(3.0), &real, &fake).double_value(&[]);
        assert!((gp - 4.0).abs() < 1e-4, "gp = {}", gp);

        // ||grad|| = 0 everywhere -> (0 - 1)^2 = 1
        let gp = gradient_penalty(linear_critic(0.0), &real, &fake).double_value(&[]);
        assert!((gp - 1.0).abs() < 1e-6, "gp = {}", gp);
    }

    #[test]
    fn test_penalty_is_non_negative_and_differentiable() {
        let (real, fake) = batch(2);
        let w = Tensor::randn([3 * 8 * 8], (Kind::Float, Device::Cpu)).set_requires_grad(true);

        // Quadratic critic so the input gradient depends on w and the input
        let critic = |x: &Tensor| {
            let flat = x.view([x.size()[0], -1]);
            (&flat * &w).square().sum_dim_intlist([1].as_slice(), false, Kind::Float)
        };
        let gp = gradient_penalty(critic, &real, &fake);
        assert!(gp.double_value(&[]) >= 0.0);

        gp.backward();
        let grad = w.grad();
        assert!(grad.defined());
        assert!(grad.abs().sum(Kind::Float).double_value(&[]) > 0.0);
    }
}
