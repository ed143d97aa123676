//! `PredRegion` (§3 C3): one AR-predictor-coded region within a DLC sub-block,
//! reconstructed with a Levinson-recurrence lattice synthesis filter.
//!
//! [`crate::dlc::encode`] never emits a predictor region (it only ever writes
//! order-0, full-width PCM-residual regions — see `SimpleEncoder` in the codec this
//! module is grounded on), but [`crate::dlc::decode`] must still reconstruct any
//! predictor region a conforming encoder could have written.

use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::{IabError, Result};

pub const MAX_REGION_LENGTH: u8 = 31;
pub const MAX_ORDER: u8 = 42;
pub const MAX_K_COEFFS: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct PredRegion {
    /// Length of this region, in sub-block samples, minus one bias removed on
    /// read/write (0 is a valid, one-sample region).
    region_length: u8,
    order: u8,
    /// Reflection (PARCOR) coefficients, 10-bit signed, index 0 used first.
    k_coeff: [i16; MAX_K_COEFFS],
}

impl Default for PredRegion {
    fn default() -> Self {
        Self {
            region_length: 0,
            order: 0,
            k_coeff: [0; MAX_K_COEFFS],
        }
    }
}

impl PredRegion {
    pub fn region_length(&self) -> u8 {
        self.region_length
    }

    pub fn set_region_length(&mut self, length: u8) -> Result<()> {
        if length > MAX_REGION_LENGTH {
            return Err(IabError::BadParams(format!(
                "predictor region length {length} exceeds max {MAX_REGION_LENGTH}"
            )));
        }
        self.region_length = length;
        Ok(())
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn set_order(&mut self, order: u8) -> Result<()> {
        if order > MAX_ORDER {
            return Err(IabError::BadParams(format!(
                "predictor order {order} exceeds max {MAX_ORDER}"
            )));
        }
        self.order = order;
        Ok(())
    }

    pub fn k_coeff(&self) -> &[i16; MAX_K_COEFFS] {
        &self.k_coeff
    }

    pub fn set_k_coeff(&mut self, coeffs: [i16; MAX_K_COEFFS]) {
        self.k_coeff = coeffs;
    }

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let mut region = PredRegion::default();
        region.set_region_length(reader.read(5)? as u8)?;
        region.set_order(reader.read(6)? as u8)?;
        let mut coeffs = [0i16; MAX_K_COEFFS];
        for coeff in coeffs.iter_mut().take(region.order as usize) {
            *coeff = reader.read_signed(10)? as i16;
        }
        region.set_k_coeff(coeffs);
        Ok(region)
    }

    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        writer.write(self.region_length as u64, 5)?;
        writer.write(self.order as u64, 6)?;
        for coeff in self.k_coeff.iter().take(self.order as usize) {
            writer.write_signed(*coeff as i64, 10)?;
        }
        Ok(())
    }

    /// Reconstructs `residual.len()` samples from this region's lattice, given the
    /// `order` most recent already-reconstructed samples preceding this region
    /// (oldest first).
    pub fn reconstruct(&self, residual: &[i64], history: &[i64]) -> Vec<i64> {
        let order = self.order as usize;
        if order == 0 {
            return residual.to_vec();
        }

        // backward prediction errors b_1..b_order, seeded from history.
        let mut b: Vec<i64> = (0..order)
            .map(|i| *history.get(history.len().wrapping_sub(1 + i)).unwrap_or(&0))
            .collect();

        let mut output = Vec::with_capacity(residual.len());
        for &e in residual {
            // synthesis lattice: unwind stage order..1 to recover f_0 = the sample.
            let mut f = e;
            let mut new_b = b.clone();
            for m in (0..order).rev() {
                let k = self.k_coeff[m] as i64;
                let f_prev = f + k * b[m];
                new_b[m] = if m == 0 { f_prev } else { b[m - 1] + k * f };
                f = f_prev;
            }
            b = new_b;
            output.push(f);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_zero_region_passes_residual_through() {
        let region = PredRegion::default();
        let residual = vec![1, -2, 3, -4];
        assert_eq!(region.reconstruct(&residual, &[]), residual);
    }

    #[test]
    fn rejects_region_length_over_max() {
        let mut region = PredRegion::default();
        assert!(region.set_region_length(MAX_REGION_LENGTH + 1).is_err());
        assert!(region.set_region_length(MAX_REGION_LENGTH).is_ok());
    }

    #[test]
    fn rejects_order_over_max() {
        let mut region = PredRegion::default();
        assert!(region.set_order(MAX_ORDER + 1).is_err());
        assert!(region.set_order(MAX_ORDER).is_ok());
    }

    #[test]
    fn region_round_trips_through_bitstream() {
        let mut region = PredRegion::default();
        region.set_region_length(5).unwrap();
        region.set_order(2).unwrap();
        let mut coeffs = [0i16; MAX_K_COEFFS];
        coeffs[0] = 100;
        coeffs[1] = -50;
        region.set_k_coeff(coeffs);

        let mut w = BitWriter::new();
        region.write(&mut w).unwrap();
        let bytes = w.into_bytes().unwrap();
        let mut r = BitReader::new(&bytes);
        let back = PredRegion::read(&mut r).unwrap();
        assert_eq!(back.region_length(), 5);
        assert_eq!(back.order(), 2);
        assert_eq!(back.k_coeff()[0], 100);
        assert_eq!(back.k_coeff()[1], -50);
    }
}
