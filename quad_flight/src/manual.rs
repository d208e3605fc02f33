//! Operator input handling (spec §4.7): translate keystrokes into
//! setpoint and mass adjustments. Manual mode never bypasses the
//! controller; it only edits the setpoint or mass.

use quad_common::consts::{MANUAL_EULER_STEP, MANUAL_WEIGHT_STEP, MANUAL_Z_STEP, MASA_DEFAULT};
use quad_common::state::{Setpoint, StateSlot};

/// A single operator keystroke, decoded from the original's key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualKey {
    Quit,
    ToggleManualMode,
    PsiInc,
    PsiDec,
    PhiInc,
    PhiDec,
    ThetaInc,
    ThetaDec,
    ZInc,
    ZDec,
    WeightReset,
    WeightInc,
    WeightDec,
}

/// Effect of applying one keystroke, for the caller to act on (shutdown,
/// re-derive `w_hover`, or nothing beyond the setpoint edit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualEffect {
    /// Operator requested shutdown.
    Quit,
    /// Manual mode was toggled; carries the new state.
    ModeToggled(bool),
    /// Setpoint was edited in place; no further action needed.
    SetpointEdited,
    /// Mass changed to this new value; caller must re-derive `w_hover`.
    MassChanged(f64),
    /// Key ignored because manual mode is off.
    IgnoredModeOff,
}

/// Owns the manual-mode flag and applies keystrokes to a setpoint/mass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualInput {
    enabled: bool,
}

impl ManualInput {
    pub const fn new() -> Self {
        Self { enabled: false }
    }

    #[inline]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Apply one keystroke. `Quit` and `ToggleManualMode` are always
    /// honored; every other key is ignored while manual mode is off
    /// (spec.md §4.7).
    pub fn apply(&mut self, key: ManualKey, sp: &mut Setpoint, mass_kg: f64) -> ManualEffect {
        use ManualKey::*;

        match key {
            Quit => return ManualEffect::Quit,
            ToggleManualMode => {
                self.enabled = !self.enabled;
                return ManualEffect::ModeToggled(self.enabled);
            }
            _ => {}
        }

        if !self.enabled {
            return ManualEffect::IgnoredModeOff;
        }

        match key {
            PsiInc => {
                sp.set(StateSlot::Psi, sp.get(StateSlot::Psi) + MANUAL_EULER_STEP);
                ManualEffect::SetpointEdited
            }
            PsiDec => {
                sp.set(StateSlot::Psi, sp.get(StateSlot::Psi) - MANUAL_EULER_STEP);
                ManualEffect::SetpointEdited
            }
            PhiInc => {
                sp.set(StateSlot::Phi, sp.get(StateSlot::Phi) + MANUAL_EULER_STEP);
                ManualEffect::SetpointEdited
            }
            PhiDec => {
                sp.set(StateSlot::Phi, sp.get(StateSlot::Phi) - MANUAL_EULER_STEP);
                ManualEffect::SetpointEdited
            }
            ThetaInc => {
                sp.set(
                    StateSlot::Theta,
                    sp.get(StateSlot::Theta) + MANUAL_EULER_STEP,
                );
                ManualEffect::SetpointEdited
            }
            ThetaDec => {
                sp.set(
                    StateSlot::Theta,
                    sp.get(StateSlot::Theta) - MANUAL_EULER_STEP,
                );
                ManualEffect::SetpointEdited
            }
            ZInc => {
                sp.set(StateSlot::Z, sp.get(StateSlot::Z) + MANUAL_Z_STEP);
                ManualEffect::SetpointEdited
            }
            ZDec => {
                sp.set(StateSlot::Z, sp.get(StateSlot::Z) - MANUAL_Z_STEP);
                ManualEffect::SetpointEdited
            }
            WeightReset => ManualEffect::MassChanged(MASA_DEFAULT),
            WeightInc => ManualEffect::MassChanged(mass_kg + MANUAL_WEIGHT_STEP),
            WeightDec => ManualEffect::MassChanged(mass_kg - MANUAL_WEIGHT_STEP),
            Quit | ToggleManualMode => unreachable!("handled above"),
        }
    }
}
