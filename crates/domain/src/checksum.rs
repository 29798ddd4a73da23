use auditrail_core::UserId;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sha2::{Digest, Sha256};

/// Sub-second digits that survive a round trip through `timestamptz`.
pub const STORAGE_SUBSECOND_DIGITS: u16 = 6;

/// Computes the tamper-evidence checksum of an audit record.
///
/// The digest covers action, subject type, subject id, the timestamp truncated to
/// storage precision and the actor id. Each field is framed by its byte length,
/// and optional fields by a presence tag, so no two distinct inputs share an encoding.
#[must_use]
pub fn compute_checksum(
    action: &str,
    subject_type: &str,
    subject_id: Option<&str>,
    occurred_at: DateTime<Utc>,
    actor_id: Option<UserId>,
) -> String {
    let timestamp = occurred_at
        .trunc_subsecs(STORAGE_SUBSECOND_DIGITS)
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    let actor = actor_id.map(|value| value.to_string());

    let mut hasher = Sha256::new();
    push_field(&mut hasher, action);
    push_field(&mut hasher, subject_type);
    push_optional_field(&mut hasher, subject_id);
    push_field(&mut hasher, timestamp.as_str());
    push_optional_field(&mut hasher, actor.as_deref());

    STANDARD.encode(hasher.finalize())
}

fn push_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn push_optional_field(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update([1_u8]);
            push_field(hasher, value);
        }
        None => hasher.update([0_u8]),
    }
}

#[cfg(test)]
mod tests {
    use auditrail_core::UserId;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    use super::compute_checksum;

    fn timestamp(micros: i64) -> DateTime<Utc> {
        Utc.timestamp_micros(micros).single().unwrap_or_else(Utc::now)
    }

    #[test]
    fn sub_microsecond_noise_does_not_change_checksum() {
        let base = timestamp(1_700_000_000_123_456);
        let noisy = base + Duration::nanoseconds(789);

        assert_eq!(
            compute_checksum("employee.updated", "Employee", Some("1"), base, None),
            compute_checksum("employee.updated", "Employee", Some("1"), noisy, None)
        );
    }

    #[test]
    fn checksum_is_base64_sha256() {
        let checksum = compute_checksum("record.created", "Asset", None, timestamp(0), None);
        assert_eq!(checksum.len(), 44);
    }

    #[test]
    fn separator_characters_cannot_shift_between_fields() {
        let at = timestamp(1_700_000_000_000_000);
        assert_ne!(
            compute_checksum("employee.updated", "Employee|1", Some("2"), at, None),
            compute_checksum("employee.updated", "Employee", Some("1|2"), at, None)
        );
        assert_ne!(
            compute_checksum("employee.updated|Employee", "", Some("1"), at, None),
            compute_checksum("employee.updated", "|Employee", Some("1"), at, None)
        );
    }

    #[test]
    fn absent_and_empty_subject_ids_differ() {
        let at = timestamp(0);
        assert_ne!(
            compute_checksum("record.created", "Asset", None, at, None),
            compute_checksum("record.created", "Asset", Some(""), at, None)
        );
    }

    proptest! {
        #[test]
        fn moving_text_across_a_field_boundary_changes_checksum(
            combined in "[A-Za-z0-9|]{2,40}",
            split in any::<proptest::sample::Index>(),
            shift in 1_usize..8,
        ) {
            let first_split = split.index(combined.len() - 1) + 1;
            let second_split = (first_split + shift).min(combined.len());
            prop_assume!(first_split != second_split);

            let at = timestamp(1_700_000_000_000_000);
            let (left, right) = combined.split_at(first_split);
            let (shifted_left, shifted_right) = combined.split_at(second_split);
            prop_assert_ne!(
                compute_checksum("employee.updated", left, Some(right), at, None),
                compute_checksum("employee.updated", shifted_left, Some(shifted_right), at, None)
            );
        }

        #[test]
        fn checksum_is_deterministic(
            action in "[a-z_.]{1,32}",
            subject in "[A-Za-z]{1,16}",
            id in proptest::option::of("[0-9a-f-]{1,36}"),
            micros in 0_i64..4_000_000_000_000_000,
            actor in proptest::option::of(any::<u128>()),
        ) {
            let actor = actor.map(|value| UserId::from_uuid(Uuid::from_u128(value)));
            let first = compute_checksum(&action, &subject, id.as_deref(), timestamp(micros), actor);
            let second = compute_checksum(&action, &subject, id.as_deref(), timestamp(micros), actor);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn altering_any_input_changes_checksum(
            action in "[a-z_.]{1,32}",
            subject in "[A-Za-z]{1,16}",
            id in "[0-9]{1,12}",
            micros in 0_i64..4_000_000_000_000_000,
            actor in any::<u128>(),
        ) {
            let actor_id = Some(UserId::from_uuid(Uuid::from_u128(actor)));
            let original = compute_checksum(&action, &subject, Some(&id), timestamp(micros), actor_id);

            let altered_action = format!("{action}x");
            let altered_subject = format!("{subject}x");
            let altered_id = format!("{id}0");
            let other_actor = Some(UserId::from_uuid(Uuid::from_u128(actor.wrapping_add(1))));

            prop_assert_ne!(&original, &compute_checksum(&altered_action, &subject, Some(&id), timestamp(micros), actor_id));
            prop_assert_ne!(&original, &compute_checksum(&action, &altered_subject, Some(&id), timestamp(micros), actor_id));
            prop_assert_ne!(&original, &compute_checksum(&action, &subject, Some(&altered_id), timestamp(micros), actor_id));
            prop_assert_ne!(&original, &compute_checksum(&action, &subject, Some(&id), timestamp(micros + 1), actor_id));
            prop_assert_ne!(&original, &compute_checksum(&action, &subject, Some(&id), timestamp(micros), other_actor));
        }
    }
}
