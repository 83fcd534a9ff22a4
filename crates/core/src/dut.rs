//! DUT pin contract.
//!
//! The device under test is an external black box; the bench sees only its
//! two 8-bit input ports and its output/output-enable ports. Which bit of
//! which port carries which protocol signal is a configuration table
//! ([`crate::config::ProtocolVariant`]), not part of this contract.

/// Input port selector for the pin map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    /// Dedicated input port (`ui_in`).
    Ui,
    /// Bidirectional port, input side (`uio_in`).
    Uio,
}

/// State of the DUT's two input ports as driven by the bench.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortPins {
    pub ui_in: u8,
    pub uio_in: u8,
}

impl PortPins {
    pub fn set_bit(&mut self, port: Port, bit: u8, value: bool) {
        let reg = match port {
            Port::Ui => &mut self.ui_in,
            Port::Uio => &mut self.uio_in,
        };
        if value {
            *reg |= 1 << bit;
        } else {
            *reg &= !(1 << bit);
        }
    }

    pub fn bit(&self, port: Port, bit: u8) -> bool {
        let reg = match port {
            Port::Ui => self.ui_in,
            Port::Uio => self.uio_in,
        };
        (reg >> bit) & 1 != 0
    }
}

/// DUT output pins as observed by the bench after an edge settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DutOutputs {
    /// 8-bit color bus.
    pub uo_out: u8,
    /// Bidirectional port, output side.
    pub uio_out: u8,
    /// Bidirectional port output enables (1 = DUT driving the pin).
    pub uio_oe: u8,
}

impl DutOutputs {
    /// Value of one `uio_out` bit as 0/1.
    pub fn uio_bit(&self, bit: u8) -> u8 {
        (self.uio_out >> bit) & 1
    }

    /// Value of one `uio_oe` bit as 0/1.
    pub fn oe_bit(&self, bit: u8) -> u8 {
        (self.uio_oe >> bit) & 1
    }
}

/// Externally observable behavior of a device under test.
///
/// The bench drives inputs between edges; the design reacts inside
/// `rising_edge`/`falling_edge` and presents settled outputs afterwards.
pub trait Dut {
    /// Assert or release the active-high reset.
    fn set_reset(&mut self, active: bool);

    /// Drive the input ports; the value holds until the next `set_inputs`.
    fn set_inputs(&mut self, pins: PortPins);

    /// Advance the design through a rising clock edge.
    fn rising_edge(&mut self);

    /// Advance the design through a falling clock edge.
    fn falling_edge(&mut self);

    /// Observe the output pins.
    fn outputs(&self) -> DutOutputs;
}
