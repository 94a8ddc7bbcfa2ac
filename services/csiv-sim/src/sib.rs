//! System Information Block summaries broadcast by simulated towers.
//!
//! Only `cellBarred` carries engine output; the remaining fields are
//! plausible filler drawn per broadcast.

use csiv_core::TowerId;
use csiv_trust_mesh::Tower;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const PLMN: &str = "00101";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomAccessConfig {
    pub preamble_initial_received_target_power: i32,
    pub power_ramping_step: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessBarring {
    pub barring_factor: String,
    pub access_category: String,
}

/// One SIB broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sib {
    pub tower_id: TowerId,
    #[serde(rename = "plmn_list")]
    pub plmn_list: Vec<String>,
    #[serde(rename = "TAC")]
    pub tac: String,
    pub cell_barred: bool,
    pub cell_reselection_priority: u8,
    pub intra_freq_reselection_allowed: bool,
    #[serde(rename = "si_periodicity")]
    pub si_periodicity: String,
    #[serde(rename = "si_window_length")]
    pub si_window_length: String,
    pub random_access_config: RandomAccessConfig,
    pub access_barring: AccessBarring,
    pub neighbors: Vec<TowerId>,
    pub identity: String,
}

/// Random tracking area code, `0x0000`..=`0xFFFF`.
pub fn random_tac<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("0x{:04X}", rng.gen::<u16>())
}

/// Build the SIB a tower would broadcast right now.
pub fn build<R: Rng + ?Sized>(tower: &Tower, tac: &str, rng: &mut R) -> Sib {
    let barring_factor = if tower.is_barred() {
        "high"
    } else {
        pick(&["low", "medium"], rng)
    };

    Sib {
        tower_id: tower.id(),
        plmn_list: vec![PLMN.to_string()],
        tac: tac.to_string(),
        cell_barred: tower.is_barred(),
        cell_reselection_priority: tower.priority(),
        intra_freq_reselection_allowed: true,
        si_periodicity: pick(&["rf8", "rf16", "rf32"], rng).to_string(),
        si_window_length: pick(&["ms1", "ms2"], rng).to_string(),
        random_access_config: RandomAccessConfig {
            preamble_initial_received_target_power: -100 + rng.gen_range(0..=5),
            power_ramping_step: 2,
        },
        access_barring: AccessBarring {
            barring_factor: barring_factor.to_string(),
            access_category: "default".to_string(),
        },
        neighbors: tower.neighbors().to_vec(),
        identity: tower.identity().to_string(),
    }
}

/// One-line human-readable rendering.
pub fn summary(sib: &Sib) -> String {
    let neighbors: Vec<String> = sib.neighbors.iter().map(ToString::to_string).collect();
    format!(
        "PLMN={} TAC={} Barred={} CRP={} intraReSel={} SI={}/{} RA=pIRP{}+step{} AB={} Nei=[{}]",
        sib.plmn_list.join(","),
        sib.tac,
        sib.cell_barred,
        sib.cell_reselection_priority,
        u8::from(sib.intra_freq_reselection_allowed),
        sib.si_periodicity,
        sib.si_window_length,
        sib.random_access_config.preamble_initial_received_target_power,
        sib.random_access_config.power_ramping_step,
        sib.access_barring.barring_factor,
        neighbors.join(","),
    )
}

fn pick<'a, R: Rng + ?Sized>(choices: &[&'a str], rng: &mut R) -> &'a str {
    choices.choose(rng).copied().unwrap_or_default()
}
