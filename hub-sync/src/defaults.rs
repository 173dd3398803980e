//! Built-in reference data used until an administrator edits the lists

use crate::model::ReferenceListKind;

pub const DEFAULT_VOUCHERS: &[&str] = &[
    "Huggies Voucher",
    "Kotex Voucher",
    "Blevit Voucher",
    "Vitafos Voucher",
];

pub const DEFAULT_PHARMACIES: &[&str] = &[
    "Rayan Main", "Sahafa-ER", "Narjis MP", "Sewedi Main", "Sahafa-MP",
    "Takhas Main", "Khobar-ER", "Khobar-MP", "Takhas OB", "Qasm-XP",
    "Fayha Main", "Olaya Main", "Sewedi Hamza", "Olaya Derma", "Takhas P Surgery",
    "Rayan OBGYN", "Hamra-ER", "Sewedi ER", "Ghadeer MP", "Burd-P-Clinic",
    "Olaya Neuro", "Qassim_Main", "Takhas Basement", "Hamra-MP", "Rayan ST",
    "Qasm-ST", "Rayan ER", "Diplomatic QP", "Olaya Ortho", "Kharj-MP",
    "Fayha ER", "Moham-MP", "Khobar-MC", "Moham-ER", "Sahafa-FF",
    "Khobar-FF", "Rabigh", "Airport-T3", "DigitalCity", "Bustan",
];

/// Admin credential on first run, unless configuration overrides it
pub const DEFAULT_ADMIN_CREDENTIAL: &str = "voucher-hub-admin";

pub fn default_list(kind: ReferenceListKind) -> Vec<String> {
    let source = match kind {
        ReferenceListKind::Voucher => DEFAULT_VOUCHERS,
        ReferenceListKind::Pharmacy => DEFAULT_PHARMACIES,
    };
    source.iter().map(|s| s.to_string()).collect()
}
