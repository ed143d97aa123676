//! Object gain quantization (§4.2): a 10-bit logarithmic code in `[0, 1023]`.
//! Code 0 is exactly unity gain; codes 1..=1023 cover `(-infinity dB, +6 dB]` on a
//! log scale. The round-trip is bit-exact on the *code*, not on the recovered float.

const MAX_CODE: u16 = 1023;
const MAX_DB: f32 = 6.0;
/// Practical floor standing in for "-infinity dB" (silence) at the highest code.
const MIN_DB: f32 = -144.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainCode(u16);

impl GainCode {
    pub const UNITY: GainCode = GainCode(0);

    pub fn from_code(code: u16) -> crate::utils::errors::Result<Self> {
        if code > MAX_CODE {
            return Err(crate::utils::errors::IabError::BadParams(format!(
                "gain code {code} exceeds 10-bit range"
            )));
        }
        Ok(GainCode(code))
    }

    pub fn code(self) -> u16 {
        self.0
    }

    /// Looks up the linear scalar for this code.
    pub fn to_linear(self) -> f32 {
        if self.0 == 0 {
            return 1.0;
        }
        if self.0 == MAX_CODE {
            return 0.0;
        }
        let t = (self.0 - 1) as f32 / (MAX_CODE - 1) as f32;
        let db = MAX_DB - t * (MAX_DB - MIN_DB);
        10f32.powf(db / 20.0)
    }

    /// Authoring convenience: nearest code for a desired linear gain. Not required to
    /// round-trip back to the original float, only used when constructing frames.
    pub fn nearest_from_linear(linear: f32) -> Self {
        if linear >= 1.0 {
            return GainCode::UNITY;
        }
        if linear <= 0.0 {
            return GainCode(MAX_CODE);
        }
        let db = 20.0 * linear.log10();
        let t = ((MAX_DB - db) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
        let code = 1 + (t * (MAX_CODE - 1) as f32).round() as u16;
        GainCode(code.min(MAX_CODE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_code_is_exactly_one() {
        assert_eq!(GainCode::UNITY.to_linear(), 1.0);
    }

    #[test]
    fn max_code_is_silence() {
        assert_eq!(GainCode::from_code(1023).unwrap().to_linear(), 0.0);
    }

    #[test]
    fn code_round_trips_exactly() {
        for code in 0..=1023u16 {
            let g = GainCode::from_code(code).unwrap();
            assert_eq!(g.code(), code);
        }
    }

    #[test]
    fn linear_scale_is_monotonically_decreasing() {
        let mut prev = f32::INFINITY;
        for code in 0..=1023u16 {
            let linear = GainCode::from_code(code).unwrap().to_linear();
            assert!(linear <= prev);
            prev = linear;
        }
    }

    #[test]
    fn rejects_out_of_range_code() {
        assert!(GainCode::from_code(1024).is_err());
    }
}
