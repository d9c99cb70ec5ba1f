use crate::models::BloodGroup;

/// Recipients a donor group can give to (ABO/Rh, red cells)
pub fn recipients_of(donor: BloodGroup) -> &'static [BloodGroup] {
    use BloodGroup::*;

    match donor {
        ONeg => &[ONeg, OPos, ANeg, APos, BNeg, BPos, AbNeg, AbPos],
        OPos => &[OPos, APos, BPos, AbPos],
        ANeg => &[ANeg, APos, AbNeg, AbPos],
        APos => &[APos, AbPos],
        BNeg => &[BNeg, BPos, AbNeg, AbPos],
        BPos => &[BPos, AbPos],
        AbNeg => &[AbNeg, AbPos],
        AbPos => &[AbPos],
    }
}

/// Check whether blood from `donor` can be transfused into `recipient`
///
/// Not symmetric: O- gives to everyone, AB+ receives from everyone.
#[inline]
pub fn can_donate(donor: BloodGroup, recipient: BloodGroup) -> bool {
    recipients_of(donor).contains(&recipient)
}

/// Compatibility flag from raw labels, 1 when compatible and 0 otherwise
///
/// Unknown labels on either side are incompatible.
#[inline]
pub fn blood_compatible(donor_bg: &str, recipient_bg: &str) -> u8 {
    match (BloodGroup::parse(donor_bg), BloodGroup::parse(recipient_bg)) {
        (Some(donor), Some(recipient)) if can_donate(donor, recipient) => 1,
        _ => 0,
    }
}
