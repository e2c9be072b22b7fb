//! Eligibility classification.
//!
//! Structures are checked against an ordered rule table. The first rule that matches decides
//! the skip reason; a structure no rule matches is eligible for conversion. Classification is
//! pure: it never touches the document and never fails.

use crate::config::{CoreConfig, IdPolicy};
use crate::constants::{ETD_ID_MARKER, ZORIG_ID_MARKER};
use crate::structure::Structure;

/// Why a structure was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyHighResolution,
    Approved,
    CannotConvert,
    EtdStructure,
    ZOrigStructure,
    UnsupportedDicomType(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyHighResolution => f.write_str("Already high resolution"),
            SkipReason::Approved => f.write_str("Unable to convert approved structures"),
            SkipReason::CannotConvert => f.write_str("Unable to convert to high resolution"),
            SkipReason::EtdStructure => f.write_str("ETD structures do not require conversion"),
            SkipReason::ZOrigStructure => {
                f.write_str("zOrig structures do not require conversion")
            }
            SkipReason::UnsupportedDicomType(t) => write!(f, "Unsupported DICOM type ({t})"),
        }
    }
}

/// Result of classifying a single structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    Eligible(Structure),
    Skipped {
        structure_id: String,
        reason: SkipReason,
    },
}

/// A structure that was skipped, with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStructure {
    pub structure_id: String,
    pub reason: SkipReason,
}

impl std::fmt::Display for SkippedStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.structure_id, self.reason)
    }
}

/// Partition of an input sequence into eligible and skipped structures.
///
/// Both halves keep the relative order of the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub eligible: Vec<Structure>,
    pub skipped: Vec<SkippedStructure>,
}

impl Classification {
    /// `"{id}: {reason}"` lines in input order.
    pub fn skip_reasons(&self) -> Vec<String> {
        self.skipped.iter().map(ToString::to_string).collect()
    }

    pub fn eligible_ids(&self) -> Vec<String> {
        self.eligible.iter().map(|s| s.id.clone()).collect()
    }

    pub fn has_eligible(&self) -> bool {
        !self.eligible.is_empty()
    }
}

type RuleCheck = fn(&Structure, &CoreConfig) -> Option<SkipReason>;

/// One entry of the rule table.
#[derive(Clone, Copy)]
pub struct Rule {
    name: &'static str,
    check: RuleCheck,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn check(&self, structure: &Structure, config: &CoreConfig) -> Option<SkipReason> {
        (self.check)(structure, config)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

const ALREADY_HIGH_RESOLUTION: Rule = Rule {
    name: "already-high-resolution",
    check: already_high_resolution,
};
const APPROVED: Rule = Rule {
    name: "approved",
    check: approved,
};
const CANNOT_CONVERT: Rule = Rule {
    name: "cannot-convert",
    check: cannot_convert,
};
const ETD_ID: Rule = Rule {
    name: "etd-id",
    check: etd_id,
};
const ZORIG_ID: Rule = Rule {
    name: "zorig-id",
    check: zorig_id,
};
const UNSUPPORTED_DICOM_TYPE: Rule = Rule {
    name: "unsupported-dicom-type",
    check: unsupported_dicom_type,
};

// Missing attribute reads fall back to the ineligible side of the rule that reads them.

fn already_high_resolution(structure: &Structure, _: &CoreConfig) -> Option<SkipReason> {
    match structure.is_high_resolution {
        Some(false) => None,
        Some(true) => Some(SkipReason::AlreadyHighResolution),
        None => {
            tracing::debug!(
                structure_id = structure.id.as_str(),
                "resolution state unreadable, treating as already high resolution"
            );
            Some(SkipReason::AlreadyHighResolution)
        }
    }
}

fn approved(structure: &Structure, _: &CoreConfig) -> Option<SkipReason> {
    match structure.is_approved {
        Some(false) => None,
        Some(true) => Some(SkipReason::Approved),
        None => {
            tracing::debug!(
                structure_id = structure.id.as_str(),
                "approval state unreadable, treating as approved"
            );
            Some(SkipReason::Approved)
        }
    }
}

fn cannot_convert(structure: &Structure, _: &CoreConfig) -> Option<SkipReason> {
    match structure.can_convert {
        Some(true) => None,
        Some(false) => Some(SkipReason::CannotConvert),
        None => {
            tracing::debug!(
                structure_id = structure.id.as_str(),
                "conversion capability unreadable, treating as not convertible"
            );
            Some(SkipReason::CannotConvert)
        }
    }
}

fn etd_id(structure: &Structure, _: &CoreConfig) -> Option<SkipReason> {
    structure
        .id
        .contains(ETD_ID_MARKER)
        .then_some(SkipReason::EtdStructure)
}

fn zorig_id(structure: &Structure, _: &CoreConfig) -> Option<SkipReason> {
    structure
        .id
        .contains(ZORIG_ID_MARKER)
        .then_some(SkipReason::ZOrigStructure)
}

fn unsupported_dicom_type(structure: &Structure, config: &CoreConfig) -> Option<SkipReason> {
    match structure.dicom_type.as_deref() {
        Some(t) if config.is_unsupported_dicom_type(t) => {
            Some(SkipReason::UnsupportedDicomType(t.to_string()))
        }
        _ => None,
    }
}

/// Ordered eligibility rules for one configuration.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    config: CoreConfig,
}

impl RuleSet {
    /// Builds the rule table for `config`.
    ///
    /// Id-substring rules sit between the capability check and the DICOM type check when the
    /// policy enables them.
    pub fn from_config(config: &CoreConfig) -> Self {
        let mut rules = vec![ALREADY_HIGH_RESOLUTION, APPROVED, CANNOT_CONVERT];
        if config.id_policy() == IdPolicy::ExcludeDerived {
            rules.push(ETD_ID);
            rules.push(ZORIG_ID);
        }
        rules.push(UNSUPPORTED_DICOM_TYPE);

        Self {
            rules,
            config: config.clone(),
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Classifies one structure. First matching rule wins.
    pub fn evaluate(&self, structure: &Structure) -> ClassificationOutcome {
        for rule in &self.rules {
            if let Some(reason) = rule.check(structure, &self.config) {
                tracing::debug!(
                    structure_id = structure.id.as_str(),
                    rule = rule.name(),
                    "structure skipped"
                );
                return ClassificationOutcome::Skipped {
                    structure_id: structure.id.clone(),
                    reason,
                };
            }
        }

        ClassificationOutcome::Eligible(structure.clone())
    }

    /// Classifies every structure independently, keeping input order in both halves.
    pub fn classify(&self, structures: &[Structure]) -> Classification {
        let mut classification = Classification::default();

        for structure in structures {
            match self.evaluate(structure) {
                ClassificationOutcome::Eligible(s) => classification.eligible.push(s),
                ClassificationOutcome::Skipped {
                    structure_id,
                    reason,
                } => classification.skipped.push(SkippedStructure {
                    structure_id,
                    reason,
                }),
            }
        }

        classification
    }
}
