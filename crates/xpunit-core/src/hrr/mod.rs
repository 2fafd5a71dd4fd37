//! Holographic Reduced Representations (HRR)
//!
//! Fixed-dimension real vectors with:
//! - **Binding**: circular convolution `a ⊛ b`, computed as
//!   `IFFT(FFT(a) ⊙ FFT(b))` in O(D log D)
//! - **Unbinding**: circular correlation, `IFFT(conj(FFT(a)) ⊙ FFT(t))`,
//!   the approximate inverse of binding
//! - **Superposition**: plain vector addition
//!
//! Symbols (roles and words) are deterministic Gaussian vectors with variance
//! `1/D`, seeded from SHA-256 of their name. The same name yields the same
//! vector in every process, so serialized context vectors stay meaningful.
//!
//! ## Capacity
//!
//! Superposing `k` bound pairs into one trace leaves the true filler with a
//! similarity of roughly `1/sqrt(k)` after unbinding, against a noise floor of
//! about `1/sqrt(D)` for unrelated symbols. At D = 512 a trace holds 10-20
//! role bindings before clean-up against a few hundred candidates starts
//! picking the wrong filler.

mod capsule;

pub use capsule::{Binding, MemoryCapsule};

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use sha2::{Digest, Sha256};

use crate::error::{ensure_dimension, Result, XpError};
use crate::policy::DEFAULT_DIMENSION;

/// Role under which ingested text is bound
pub const ROLE_CONTENT: &str = "content";

/// Role under which flashbulb trigger text is bound
pub const ROLE_FLASHBULB: &str = "flashbulb";

/// Words that carry no topical signal
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "at", "for", "with", "as",
    "is", "it", "its", "was", "be", "been", "are", "were", "this", "that", "i", "me", "my",
    "you", "we", "our", "so", "just", "by", "from", "about",
];

// ============================================================================
// HRR SPACE
// ============================================================================

/// The vector space all units of one environment share.
///
/// Holds cached FFT plans for the configured dimension. Not serialized: it is
/// fully determined by the dimension.
pub struct HrrSpace {
    dim: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    norm_factor: f32,
}

impl std::fmt::Debug for HrrSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HrrSpace")
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl Clone for HrrSpace {
    fn clone(&self) -> Self {
        Self {
            dim: self.dim,
            fft: Arc::clone(&self.fft),
            ifft: Arc::clone(&self.ifft),
            norm_factor: self.norm_factor,
        }
    }
}

impl Default for HrrSpace {
    fn default() -> Self {
        Self::build(DEFAULT_DIMENSION)
    }
}

impl HrrSpace {
    /// Create a space of the given dimensionality.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(XpError::InvalidPolicy(
                "HRR dimension must be positive".to_string(),
            ));
        }
        Ok(Self::build(dim))
    }

    fn build(dim: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            dim,
            fft: planner.plan_fft_forward(dim),
            ifft: planner.plan_fft_inverse(dim),
            norm_factor: 1.0 / dim as f32,
        }
    }

    /// Dimensionality `D`
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// All-zero vector
    pub fn zeros(&self) -> Vec<f32> {
        vec![0.0; self.dim]
    }

    /// Deterministic random symbol for `name`, N(0, 1/D) per component.
    pub fn symbol(&self, name: &str) -> Vec<f32> {
        let digest = Sha256::digest(name.as_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(seed));

        let std_dev = (1.0 / self.dim as f64).sqrt();
        let mut vector = Vec::with_capacity(self.dim);
        // Box-Muller, two samples per draw
        while vector.len() < self.dim {
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen_range(0.0..1.0);
            let radius = (-2.0 * u1.ln()).sqrt() * std_dev;
            let theta = std::f64::consts::TAU * u2;
            vector.push((radius * theta.cos()) as f32);
            if vector.len() < self.dim {
                vector.push((radius * theta.sin()) as f32);
            }
        }
        vector
    }

    /// Symbol used as a binding role
    pub fn role(&self, name: &str) -> Vec<f32> {
        self.symbol(&format!("role:{}", name))
    }

    /// Encode text as the normalized superposition of its word symbols.
    ///
    /// Text without any content word encodes to the zero vector.
    pub fn encode_text(&self, text: &str) -> Vec<f32> {
        let mut vector = self.zeros();
        for token in tokenize(text) {
            let symbol = self.symbol(&format!("word:{}", token));
            add_scaled(&mut vector, &symbol, 1.0);
        }
        normalize(&mut vector);
        vector
    }

    /// Bind two vectors with circular convolution. Fails fast on dimension mismatch.
    pub fn bind(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        ensure_dimension(self.dim, a.len())?;
        ensure_dimension(self.dim, b.len())?;
        Ok(self.convolve(a, b))
    }

    /// Recover the approximate filler bound to `role` inside `trace`.
    pub fn unbind(&self, role: &[f32], trace: &[f32]) -> Result<Vec<f32>> {
        ensure_dimension(self.dim, role.len())?;
        ensure_dimension(self.dim, trace.len())?;
        Ok(self.correlate(role, trace))
    }

    /// Circular convolution. Inputs are zero-padded or truncated to `D`.
    pub(crate) fn convolve(&self, a: &[f32], b: &[f32]) -> Vec<f32> {
        let mut a_fft = self.forward(a);
        let b_fft = self.forward(b);
        for (x, y) in a_fft.iter_mut().zip(b_fft.iter()) {
            *x *= *y;
        }
        self.inverse(a_fft)
    }

    /// Circular correlation. Inputs are zero-padded or truncated to `D`.
    pub(crate) fn correlate(&self, a: &[f32], b: &[f32]) -> Vec<f32> {
        let mut a_fft = self.forward(a);
        let b_fft = self.forward(b);
        for (x, y) in a_fft.iter_mut().zip(b_fft.iter()) {
            *x = x.conj() * *y;
        }
        self.inverse(a_fft)
    }

    fn forward(&self, x: &[f32]) -> Vec<Complex32> {
        let mut buffer: Vec<Complex32> = (0..self.dim)
            .map(|i| Complex32::new(x.get(i).copied().unwrap_or(0.0), 0.0))
            .collect();
        self.fft.process(&mut buffer);
        buffer
    }

    fn inverse(&self, mut buffer: Vec<Complex32>) -> Vec<f32> {
        self.ifft.process(&mut buffer);
        buffer.iter().map(|c| c.re * self.norm_factor).collect()
    }
}

// ============================================================================
// VECTOR HELPERS
// ============================================================================

/// Lower-cased content words of `text`, stop-words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 {
        (dot_product / denominator).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Euclidean norm
#[inline]
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let n = norm(v);
    if n > 0.0 && n.is_finite() {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
}

/// `target += scale * source`, over the shared prefix.
pub fn add_scaled(target: &mut [f32], source: &[f32], scale: f32) {
    for (t, s) in target.iter_mut().zip(source.iter()) {
        *t += scale * s;
    }
}

// ============================================================================
// TESTS
// ============================================================================
