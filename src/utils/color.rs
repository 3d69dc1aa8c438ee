/// Colours handed out to collaborators. The palette is fixed so that the same
/// user id maps to the same colour on every server and client.
const PALETTE: [&str; 12] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#bfef45",
    "#469990", "#9a6324", "#800000", "#000075",
];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic colour for a user, stable across reconnects and processes.
#[must_use]
pub fn user_color(user_id: &str) -> String {
    let hash = user_id.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });

    PALETTE[(hash % PALETTE.len() as u64) as usize].to_owned()
}
