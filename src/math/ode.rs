//! Fixed-step ODE integration.

/// One classical fourth-order Runge-Kutta step of `dy/dt = f(t, y)`.
pub fn rk4_step<const N: usize, F>(f: F, t: f64, y: &[f64; N], dt: f64) -> [f64; N]
where
    F: Fn(f64, &[f64; N]) -> [f64; N],
{
    let k1 = f(t, y);
    let k2 = f(t + 0.5 * dt, &offset(y, &k1, 0.5 * dt));
    let k3 = f(t + 0.5 * dt, &offset(y, &k2, 0.5 * dt));
    let k4 = f(t + dt, &offset(y, &k3, dt));

    let mut out = *y;
    for i in 0..N {
        out[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    out
}

fn offset<const N: usize>(y: &[f64; N], k: &[f64; N], h: f64) -> [f64; N] {
    let mut out = *y;
    for i in 0..N {
        out[i] += h * k[i];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_decay_is_accurate() {
        let mut y = [1.0];
        let dt = 0.01;
        for i in 0..100 {
            y = rk4_step(|_, s: &[f64; 1]| [-s[0]], i as f64 * dt, &y, dt);
        }
        let exact = (-1.0f64).exp();
        assert!((y[0] - exact).abs() < 1e-9, "y={} exact={exact}", y[0]);
    }

    #[test]
    fn harmonic_oscillator_conserves_energy() {
        let mut y = [1.0, 0.0];
        let dt = 0.001;
        for i in 0..6283 {
            y = rk4_step(|_, s: &[f64; 2]| [s[1], -s[0]], i as f64 * dt, &y, dt);
        }
        let energy = y[0] * y[0] + y[1] * y[1];
        assert!((energy - 1.0).abs() < 1e-8, "energy={energy}");
    }
}
