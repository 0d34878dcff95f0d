//! Property tests for the prediction pipeline invariants.

#![allow(clippy::unwrap_used, clippy::panic)]

use gradecast_core::schema;
use gradecast_core::{
    BuildContext, ConfidenceConfig, FeatureVectorBuilder, FieldNormalizer, FieldValue,
    Interpretation, MissingFieldSet, ModelSelector, ModelVariant, PipelineConfig, Stage,
    StudentRecord, Variant, confidence,
};
use proptest::prelude::*;

const NUMERIC: [&str; 8] = [
    schema::QUIZ1,
    schema::QUIZ2,
    schema::ASSIGNMENT1,
    schema::ASSIGNMENT2,
    schema::MIDTERM,
    schema::STUDY_HOURS,
    schema::SLEEP_HOURS,
    schema::PHYSICAL_ACTIVITY,
];

fn arb_label(labels: &'static [&'static str]) -> impl Strategy<Value = &'static str> {
    proptest::sample::select(labels)
}

/// A record holding every full-stage feature with a valid value.
fn arb_full_record() -> impl Strategy<Value = StudentRecord> {
    (
        proptest::collection::vec(0.0f64..100.0, NUMERIC.len()),
        0.0f64..=100.0,
        arb_label(&["poor", "average", "good", "excellent"]),
        arb_label(&["low", "medium", "high"]),
        arb_label(&["female", "male"]),
        arb_label(&["negative", "neutral", "positive"]),
        arb_label(&["no", "yes"]),
    )
        .prop_map(|(nums, attendance, tq, mot, gender, peer, extra)| {
            let mut record = StudentRecord::new()
                .with(schema::ATTENDANCE, attendance)
                .with(schema::TEACHER_QUALITY, tq)
                .with(schema::MOTIVATION, mot)
                .with(schema::GENDER, gender)
                .with(schema::PEER_INFLUENCE, peer)
                .with(schema::EXTRACURRICULAR, extra);
            for (name, value) in NUMERIC.iter().zip(nums) {
                record = record.with(*name, value);
            }
            record
        })
}

fn selector(config: PipelineConfig) -> ModelSelector {
    ModelSelector::new(config).unwrap()
}

// ── Stage classification ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn complete_record_always_selects_full_stage(record in arb_full_record()) {
        let selection = selector(PipelineConfig::staged()).select("Medium", &record, None).unwrap();
        prop_assert_eq!(selection.key.variant, ModelVariant::Stage(Stage::Full));
    }

    #[test]
    fn complete_record_beats_smaller_stage_hint(
        record in arb_full_record(),
        hint in proptest::sample::select(vec!["early", "mid", "Early", "MID"]),
    ) {
        let selection = selector(PipelineConfig::staged()).select("Medium", &record, Some(hint)).unwrap();
        prop_assert_eq!(selection.key.variant, ModelVariant::Stage(Stage::Full));
    }

    #[test]
    fn extra_unmapped_fields_do_not_change_stage(
        record in arb_full_record(),
        extra in "[a-z]{3,8}_x",
        value in 0.0f64..10.0,
    ) {
        let s = selector(PipelineConfig::staged());
        let base = s.select("Easy", &record, None).unwrap();
        let widened = s.select("Easy", &record.clone().with(extra, value), None).unwrap();
        prop_assert_eq!(base.key, widened.key);
    }
}

// ── Variant resolution ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn single_missing_field_resolves_deterministically(
        record in arb_full_record(),
        idx in 0usize..5,
    ) {
        let tracked = [
            schema::QUIZ1,
            schema::QUIZ2,
            schema::ASSIGNMENT1,
            schema::ASSIGNMENT2,
            schema::MIDTERM,
        ];
        let dropped = tracked[idx];
        let expected = match dropped {
            schema::MIDTERM => Variant::NullMidterm,
            schema::QUIZ1 | schema::ASSIGNMENT2 => Variant::NullQuiz1,
            _ => Variant::Full,
        };

        let record = record.with(dropped, FieldValue::Absent);
        let s = selector(PipelineConfig::default());
        let first = s.select("DATA301", &record, None).unwrap();
        let second = s.select("DATA301", &record, None).unwrap();

        prop_assert_eq!(first.key.variant, ModelVariant::Variant(expected));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn midterm_outranks_every_other_gap(record in arb_full_record(), drop_quiz in any::<bool>()) {
        let mut record = record.with(schema::MIDTERM, FieldValue::Absent);
        if drop_quiz {
            record = record.with(schema::QUIZ1, FieldValue::Absent);
        }
        let selection = selector(PipelineConfig::default()).select("WEB101", &record, None).unwrap();
        prop_assert_eq!(selection.key.variant, ModelVariant::Variant(Variant::NullMidterm));
    }
}

// ── Feature vectors ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn vector_length_matches_expected(
        record in arb_full_record(),
        keep in proptest::collection::vec(any::<bool>(), NUMERIC.len()),
    ) {
        let mut sparse = record;
        for (name, kept) in NUMERIC.iter().zip(keep) {
            if !kept {
                sparse = sparse.with(*name, FieldValue::Absent);
            }
        }

        let config = PipelineConfig::staged();
        let expected = config.stages.required(Stage::Full).to_vec();
        let missing = MissingFieldSet::empty();
        let ctx = BuildContext { subject: "Hard", missing: &missing, tolerates_missing: true };
        let built = FeatureVectorBuilder::new(&config).build(&sparse, ctx, &expected).unwrap();

        prop_assert_eq!(built.vector.len(), expected.len());
        prop_assert_eq!(built.vector.names(), expected.as_slice());
        prop_assert_eq!(built.vector.sentinel_count(), built.imputed.len());
    }
}

// ── Confidence & interpretation ──────────────────────────────────────────

proptest! {
    #[test]
    fn confidence_is_bounded_and_monotone(n in 0usize..50) {
        let c = ConfidenceConfig::default();
        let here = confidence(&c, n);
        let next = confidence(&c, n + 1);

        prop_assert!((0.5..=0.9).contains(&here));
        prop_assert!(next <= here);
    }

    #[test]
    fn bands_follow_thresholds(grade in -20.0f64..120.0) {
        let band = Interpretation::from_grade(grade);
        let expected = if grade >= 85.0 {
            Interpretation::Excellent
        } else if grade >= 70.0 {
            Interpretation::Good
        } else if grade >= 50.0 {
            Interpretation::Average
        } else {
            Interpretation::NeedsImprovement
        };
        prop_assert_eq!(band, expected);
    }
}

// ── Normalization ────────────────────────────────────────────────────────

fn arb_spelling() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(vec![
        "Quiz 1",
        "quiz_2",
        "Midterm_Marks",
        "Hours-Studied",
        "motivation_level",
        "Attendance",
        "subject_code",
        "unmapped_field",
        "teacher_quality",
    ])
}

proptest! {
    #[test]
    fn normalization_is_idempotent(
        entries in proptest::collection::vec((arb_spelling(), 0.0f64..100.0), 0..9),
    ) {
        let record: StudentRecord = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Number(v)))
            .collect();
        let normalizer = FieldNormalizer::new();
        let once = normalizer.normalize(&record);
        let twice = normalizer.normalize(&once);
        prop_assert_eq!(once, twice);
    }
}
