//! Tower height generation

use rand_core::{impls, Error, RngCore, SeedableRng};

/// Size of the uniform draw; a draw of 0 promotes one level (p = 1/4)
pub const PROMOTION_DRAW_RANGE: u32 = 4;

/// Marsaglia xorshift generator with 32 bits of state
///
/// Small, fast and fully reproducible from its seed. Not suitable for
/// anything but tower heights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Seed used when none is supplied
    pub const DEFAULT_SEED: u32 = 1_234_567;

    /// Creates a generator; a zero seed (a fixed point) is replaced with
    /// [`Self::DEFAULT_SEED`]
    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 { Self::DEFAULT_SEED } else { seed };
        Self { state }
    }
}

impl Default for XorShift32 {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

impl RngCore for XorShift32 {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Geometric tower-height generator
///
/// Starting at height 0, draws uniformly from `0..PROMOTION_DRAW_RANGE`
/// and promotes while the draw is 0, never exceeding `levels - 1`.
#[derive(Debug, Clone)]
pub struct TowerHeights<R = XorShift32> {
    rng: R,
    max_height: u8,
}

impl<R: RngCore> TowerHeights<R> {
    /// Creates a generator for a queue with `levels` levels
    ///
    /// `levels` must be at least 1; the caller validates it.
    pub fn new(rng: R, levels: usize) -> Self {
        Self {
            rng,
            max_height: levels.saturating_sub(1).min(u8::MAX as usize) as u8,
        }
    }

    /// Highest height this generator can return
    pub fn max_height(&self) -> u8 {
        self.max_height
    }

    /// Draws the next tower height
    pub fn next_height(&mut self) -> u8 {
        let mut height = 0;
        while height < self.max_height && self.rng.next_u32() % PROMOTION_DRAW_RANGE == 0 {
            height += 1;
        }
        height
    }
}
