//! Character allowlists per stat field.
//!
//! Every region name on a stats page maps to a value type (integer, float,
//! percentage, text, timespan). The type decides which characters the OCR
//! engine may emit for that region.

use crate::error::PipelineError;

const DIGITS: &str = "0123456789";
const DIGITS_AND_SPACE: &str = "0123456789 ";
const DECIMAL: &str = "0123456789.";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PERCENT: &str = "0123456789%";
const TIMESPAN: &str = "0123456789:";

/// Value type of a stat field, in resolution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Goal breakdown counts, rendered blank when zero.
    NullableInteger,
    Integer,
    Float,
    Text,
    Percentage,
    Timespan,
}

impl FieldKind {
    pub fn chars(self) -> &'static str {
        match self {
            FieldKind::NullableInteger => DIGITS_AND_SPACE,
            FieldKind::Integer => DIGITS,
            FieldKind::Float => DECIMAL,
            FieldKind::Text => UPPERCASE,
            FieldKind::Percentage => PERCENT,
            FieldKind::Timespan => TIMESPAN,
        }
    }
}

/// The set of characters OCR is allowed to output for one region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allowlist {
    chars: String,
    kind: Option<FieldKind>,
}

impl Allowlist {
    pub fn for_kind(kind: FieldKind) -> Self {
        Self {
            chars: kind.chars().to_string(),
            kind: Some(kind),
        }
    }

    /// Builds an allowlist from the distinct characters of `vocabulary`,
    /// keeping first-seen order.
    pub fn from_vocabulary(vocabulary: &str) -> Self {
        let mut chars = String::new();
        for c in vocabulary.chars() {
            if !chars.contains(c) {
                chars.push(c);
            }
        }
        Self { chars, kind: None }
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    /// Field kind this allowlist was resolved from; `None` for ad-hoc vocabularies.
    pub fn kind(&self) -> Option<FieldKind> {
        self.kind
    }

    pub fn allows(&self, text: &str) -> bool {
        text.chars().all(|c| self.chars.contains(c))
    }
}

// DEFENDING
const DEFENDING_INTS: &[&str] = &[
    "STANDING_TACKLES_AWAY",
    "INTERCEPTIONS_AWAY",
    "AERIAL_DUELS_WON_AWAY",
    "DEFENSIVE_DUELS_WON_HOME",
    "STANDING_TACKLES_WON_HOME",
    "BEATEN_BY_OPPONENT_HOME",
    "FOULS_COMMITTED_AWAY",
    "BLOCKS_HOME",
    "STANDING_TACKLES_WON_AWAY",
    "PENALTIES_COMMITTED_AWAY",
    "OFFENSIVE_DUELS_WON_HOME",
    "SLIDING_TACKLES_AWAY",
    "RED_CARDS_HOME",
    "SLIDING_TACKLES_HOME",
    "PENALTIES_COMMITTED_HOME",
    "OFFENSIVE_DUELS_WON_AWAY",
    "BLOCKS_AWAY",
    "BEATEN_BY_OPPONENT_AWAY",
    "STANDING_TACKLES_HOME",
    "CLEARANCES_HOME",
    "CLEARANCES_AWAY",
    "DEFENSIVE_DUELS_WON_AWAY",
    "RED_CARDS_AWAY",
    "SAVES_AWAY",
    "YELLOW_CARDS_HOME",
    "SLIDING_TACKLES_WON_AWAY",
    "INTERCEPTIONS_HOME",
    "YELLOW_CARDS_AWAY",
    "SAVES_HOME",
    "SLIDING_TACKLES_WON_HOME",
    "AERIAL_DUELS_WON_HOME",
    "FOULS_COMMITTED_HOME",
];
const DEFENDING_FLOATS: &[&str] = &[];
const DEFENDING_PERCENTAGES: &[&str] = &["TACKLE_SUCCESS_RATE_HOME", "TACKLE_SUCCESS_RATE_AWAY"];
const DEFENDING_TEXTS: &[&str] = &[];
const DEFENDING_TIMESPANS: &[&str] = &[];

// PASSING
const PASSING_INTS: &[&str] = &[
    "PASS_AND_GO_HOME",
    "CROSS_HOME",
    "LOBBED_THROUGH_AWAY",
    "KEY_PASS_HOME",
    "BREAKAWAY_HOME",
    "GROUND_HOME",
    "KEY_PASS_AWAY",
    "BREAKAWAY_AWAY",
    "DOWN_WING_AWAY",
    "OFFSIDE_AWAY",
    "TOTAL_PASSES_AWAY",
    "THROUGH_HOME",
    "SET_PIECES_HOME",
    "COMPLETED_HOME",
    "OTHER_HOME",
    "FIRST_TIME_HOME",
    "FIRST_TIME_AWAY",
    "LOB_AWAY",
    "THROUGH_AWAY",
    "OTHER_AWAY",
    "OFFSIDE_HOME",
    "DOWN_WING_HOME",
    "INTERCEPTED_AWAY",
    "CROSS_AWAY",
    "GROUND_AWAY",
    "SET_PIECES_AWAY",
    "COMPLETED_AWAY",
    "PASS_AND_GO_AWAY",
    "TOTAL_PASSES_HOME",
    "LOBBED_THROUGH_HOME",
    "LOB_HOME",
    "INTERCEPTED_HOME",
];
const PASSING_FLOATS: &[&str] = &[];
const PASSING_PERCENTAGES: &[&str] = &[];
const PASSING_TEXTS: &[&str] = &[];
const PASSING_TIMESPANS: &[&str] = &[];

// SHOOTING
const SHOOTING_INTS: &[&str] = &[
    "POWER_AWAY",
    "CHIP_AWAY",
    "FINESSE_HOME",
    "BLOCKED_AWAY",
    "NORMAL_HOME",
    "INSIDE_THE_BOX_AWAY",
    "CHIP_HOME",
    "HEADER_AWAY",
    "OFF_TARGET_HOME",
    "FINESSE_AWAY",
    "HEADER_HOME",
    "FAR_SIDE_HOME",
    "SET_PIECES_HOME",
    "VOLLEY_HOME",
    "ON_TARGET_HOME",
    "NEAR_SIDE_HOME",
    "FAR_SIDE_AWAY",
    "TOTAL_SHOTS_AWAY",
    "SET_PIECES_AWAY",
    "POWER_HOME",
    "OFF_TARGET_AWAY",
    "INSIDE_THE_BOX_HOME",
    "OUTSIDE_THE_BOX_AWAY",
    "ON_TARGET_AWAY",
    "TOTAL_SHOTS_HOME",
    "VOLLEY_AWAY",
    "BLOCKED_HOME",
    "OUTSIDE_THE_BOX_HOME",
    "NORMAL_AWAY",
    "NEAR_SIDE_AWAY",
];
const SHOOTING_FLOATS: &[&str] = &[];
const SHOOTING_PERCENTAGES: &[&str] = &[];
const SHOOTING_TEXTS: &[&str] = &[];
const SHOOTING_TIMESPANS: &[&str] = &[];

// SUMMARY
const SUMMARY_INTS: &[&str] = &[
    "PASSES_HOME",
    "INTERCEPTIONS_AWAY",
    "YELLOW_CARDS_AWAY",
    "PENALTY_KICKS_HOME",
    "SAVES_HOME",
    "SHOTS_HOME",
    "SCORE_AWAY",
    "POSSESSION_AWAY",
    "CORNERS_HOME",
    "FOULS_COMMITTED_AWAY",
    "TACKLES_HOME",
    "CORNERS_AWAY",
    "SCORE_HOME",
    "TACKLES_WON_HOME",
    "PENALTY_KICKS_AWAY",
    "TACKLES_AWAY",
    "OFFSIDES_HOME",
    "FOULS_COMMITTED_HOME",
    "FREE_KICKS_HOME",
    "SHOTS_AWAY",
    "TACKLES_WON_AWAY",
    "BALL_RECOVERY_TIME_HOME",
    "BALL_RECOVERY_TIME_AWAY",
    "OFFSIDES_AWAY",
    "SAVES_AWAY",
    "POSSESSION_HOME",
    "YELLOW_CARDS_HOME",
    "PASSES_AWAY",
    "INTERCEPTIONS_HOME",
    "FREE_KICKS_AWAY",
];
const SUMMARY_FLOATS: &[&str] = &["EXPECTED_GOALS_AWAY", "EXPECTED_GOALS_HOME"];
const SUMMARY_PERCENTAGES: &[&str] = &[
    "PASS_ACCURACY_HOME",
    "DRIBBLE_SUCCESS_RATE_HOME",
    "PASS_ACCURACY_AWAY",
    "SHOT_ACCURACY_AWAY",
    "SHOT_ACCURACY_HOME",
    "DRIBBLE_SUCCESS_RATE_AWAY",
];
const SUMMARY_TEXTS: &[&str] = &["TEAM_HOME", "TEAM_AWAY", "PAGE_ID"];
const SUMMARY_TIMESPANS: &[&str] = &["TOTAL_MATCH_TIME"];

// Goal breakdown counts on the shooting page can be blank.
const NULLABLE_INTS: &[&str] = &[
    "INSIDE_THE_BOX_GOALS_HOME",
    "FAR_SIDE_GOALS_HOME",
    "INSIDE_THE_BOX_GOALS_AWAY",
    "FINESSE_GOALS_AWAY",
    "CHIP_GOALS_HOME",
    "VOLLEY_GOALS_HOME",
    "NORMAL_GOALS_HOME",
    "SET_PIECES_GOALS_AWAY",
    "OUTSIDE_THE_BOX_GOALS_HOME",
    "OUTSIDE_THE_BOX_GOALS_AWAY",
    "NORMAL_GOALS_AWAY",
    "SET_PIECES_GOALS_HOME",
    "CHIP_GOALS_AWAY",
    "FINESSE_GOALS_HOME",
    "POWER_GOALS_HOME",
    "POWER_GOALS_AWAY",
    "HEADER_GOALS_HOME",
    "HEADER_GOALS_AWAY",
    "FAR_SIDE_GOALS_AWAY",
    "NEAR_SIDE_GOALS_AWAY",
    "NEAR_SIDE_GOALS_HOME",
    "VOLLEY_GOALS_AWAY",
];

/// Field tables of one stats page.
struct DomainTables {
    ints: &'static [&'static str],
    floats: &'static [&'static str],
    percentages: &'static [&'static str],
    texts: &'static [&'static str],
    timespans: &'static [&'static str],
}

const DOMAINS: [DomainTables; 4] = [
    DomainTables {
        ints: DEFENDING_INTS,
        floats: DEFENDING_FLOATS,
        percentages: DEFENDING_PERCENTAGES,
        texts: DEFENDING_TEXTS,
        timespans: DEFENDING_TIMESPANS,
    },
    DomainTables {
        ints: PASSING_INTS,
        floats: PASSING_FLOATS,
        percentages: PASSING_PERCENTAGES,
        texts: PASSING_TEXTS,
        timespans: PASSING_TIMESPANS,
    },
    DomainTables {
        ints: SHOOTING_INTS,
        floats: SHOOTING_FLOATS,
        percentages: SHOOTING_PERCENTAGES,
        texts: SHOOTING_TEXTS,
        timespans: SHOOTING_TIMESPANS,
    },
    DomainTables {
        ints: SUMMARY_INTS,
        floats: SUMMARY_FLOATS,
        percentages: SUMMARY_PERCENTAGES,
        texts: SUMMARY_TEXTS,
        timespans: SUMMARY_TIMESPANS,
    },
];

/// True if any entry of the selected table (across all domains) occurs in `region`.
fn matches_any(region: &str, table: fn(&DomainTables) -> &'static [&'static str]) -> bool {
    DOMAINS
        .iter()
        .flat_map(|domain| table(domain).iter())
        .any(|field| region.contains(field))
}

/// Resolves the OCR allowlist for a region name.
///
/// Checked in order: nullable integers, integers, floats, text,
/// percentages, timespans. The first table with an entry contained in
/// `region` wins.
pub fn resolve(region: &str) -> Result<Allowlist, PipelineError> {
    let kind = if NULLABLE_INTS.iter().any(|field| region.contains(field)) {
        FieldKind::NullableInteger
    } else if matches_any(region, |d| d.ints) {
        FieldKind::Integer
    } else if matches_any(region, |d| d.floats) {
        FieldKind::Float
    } else if matches_any(region, |d| d.texts) {
        FieldKind::Text
    } else if matches_any(region, |d| d.percentages) {
        FieldKind::Percentage
    } else if matches_any(region, |d| d.timespans) {
        FieldKind::Timespan
    } else {
        return Err(PipelineError::UnknownFieldType {
            region: region.to_string(),
        });
    };

    Ok(Allowlist::for_kind(kind))
}

/// Checks that every region name resolves. Returns the first offender.
pub fn validate_regions<'a, I>(regions: I) -> Result<(), PipelineError>
where
    I: IntoIterator<Item = &'a str>,
{
    for region in regions {
        resolve(region)?;
    }
    Ok(())
}
