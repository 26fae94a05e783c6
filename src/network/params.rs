//! Physical constants of the network: geometry, radio energy model and
//! wireless charging model.

use serde::{Deserialize, Serialize};

use crate::geometry::Position;

/// Network-wide physical parameters shared by nodes, chargers and the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    // --- Geometry ---
    /// Location of the base station (sink).
    pub base: Position,
    /// Location of the depot where chargers recharge themselves.
    pub depot: Position,

    // --- Radio energy model (joules per bit) ---
    /// Energy spent by the receiver electronics per bit.
    pub e_rx: f64,
    /// Energy spent by the transmitter electronics per bit.
    pub e_tx: f64,
    /// Free-space amplifier energy per bit per m².
    pub e_fs: f64,
    /// Multi-path amplifier energy per bit per m⁴.
    pub e_mp: f64,
    /// Size in bits of a sensed-data packet.
    pub package_size: f64,

    // --- Charging model ---
    /// Numerator of the inverse-square charging rate `alpha / (d + beta)²`.
    pub charge_alpha: f64,
    /// Distance offset of the inverse-square charging rate.
    pub charge_beta: f64,

    // --- Chargers ---
    /// Absolute energy floor below which a charger must return to the depot.
    /// Read both when a charger is dispatched and while it executes a plan.
    pub mc_energy_floor: f64,
}

impl NetworkParams {
    /// Crossover distance between the free-space and multi-path models.
    pub fn d0(&self) -> f64 {
        (self.e_fs / self.e_mp).sqrt()
    }

    /// Energy needed to transmit `bits` over `distance`.
    pub fn transmit_cost(&self, bits: f64, distance: f64) -> f64 {
        let amp = if distance <= self.d0() {
            self.e_fs * distance.powi(2)
        } else {
            self.e_mp * distance.powi(4)
        };
        bits * (self.e_tx + amp)
    }

    /// Energy needed to receive `bits`.
    pub fn receive_cost(&self, bits: f64) -> f64 {
        bits * self.e_rx
    }

    /// Charging power delivered at `distance` from a standing charger.
    pub fn charge_rate(&self, distance: f64) -> f64 {
        self.charge_alpha / (distance + self.charge_beta).powi(2)
    }

    /// Charging power delivered from `source` to `target`.
    pub fn charge_rate_between(&self, source: &Position, target: &Position) -> f64 {
        self.charge_rate(source.distance_to(target))
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            base: Position::new(500.0, 500.0),
            depot: Position::new(0.0, 0.0),
            e_rx: 0.0001,
            e_tx: 0.00005,
            e_fs: 0.00000001,
            e_mp: 0.0000000000013,
            package_size: 400.0,
            charge_alpha: 36.0,
            charge_beta: 30.0,
            mc_energy_floor: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_rate_falls_with_distance() {
        let params = NetworkParams::default();
        assert!(params.charge_rate(0.0) > params.charge_rate(10.0));
        assert!((params.charge_rate(0.0) - 36.0 / 900.0).abs() < 1e-12);
    }

    #[test]
    fn transmit_cost_switches_model_at_d0() {
        let params = NetworkParams::default();
        let d0 = params.d0();
        let near = params.transmit_cost(1.0, d0 * 0.5);
        let far = params.transmit_cost(1.0, d0 * 2.0);
        assert!((near - (params.e_tx + params.e_fs * (d0 * 0.5).powi(2))).abs() < 1e-15);
        assert!((far - (params.e_tx + params.e_mp * (d0 * 2.0).powi(4))).abs() < 1e-15);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let params: NetworkParams = serde_json::from_str(r#"{"charge_alpha": 10.0}"#).unwrap();
        assert_eq!(params.charge_alpha, 10.0);
        assert_eq!(params.base, Position::new(500.0, 500.0));
    }
}
