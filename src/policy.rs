//! The debt-transfer eligibility policy, as data and pure functions.
//!
//! The inference prompt ([`crate::prompts`]) is rendered from the tables in
//! this module, so the instruction text and the local rules cannot drift
//! apart. The same functions back the advisory cross-check in
//! [`crate::report::cross_check`].
//!
//! Bump [`POLICY_VERSION`] together with [`crate::schema::SCHEMA_VERSION`]
//! whenever a rule changes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::report::DebtRecord;

/// Version of the rule set below.
pub const POLICY_VERSION: &str = "2024.11-transfer";

// ── Net-income tiers ─────────────────────────────────────────────────────

/// Operation-amount tier supported by a given net income.
///
/// Ordered from lowest to highest, so `Ord` follows the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationTier {
    /// Net income under R$ 100,00: rejected.
    BelowMinimum,
    /// Operations up to R$ 2.999,99.
    UpTo2999,
    /// Operations from R$ 3.000,00 to R$ 14.999,99.
    From3000To14999,
    /// Operations from R$ 15.000,00 to R$ 49.999,99.
    From15000To49999,
    /// Operations from R$ 50.000,00 to R$ 195.000,00.
    From50000To195000,
}

impl OperationTier {
    /// Highest tier first; the first threshold met wins.
    const DESCENDING: [OperationTier; 4] = [
        OperationTier::From50000To195000,
        OperationTier::From15000To49999,
        OperationTier::From3000To14999,
        OperationTier::UpTo2999,
    ];

    /// Minimum net income for this tier, in centavos.
    pub fn min_net_income_cents(self) -> i64 {
        match self {
            OperationTier::BelowMinimum => 0,
            OperationTier::UpTo2999 => 10_000,
            OperationTier::From3000To14999 => 25_000,
            OperationTier::From15000To49999 => 50_000,
            OperationTier::From50000To195000 => 100_000,
        }
    }

    /// Minimum net income for this tier, in reais.
    pub fn min_net_income(self) -> f64 {
        self.min_net_income_cents() as f64 / 100.0
    }

    /// The tier for a net income in reais.
    ///
    /// Total over `f64`: NaN and negatives land in `BelowMinimum`. The
    /// comparison runs in whole centavos so `99.999` cannot slip past 100.
    pub fn for_net_income(liquido: f64) -> Self {
        if !liquido.is_finite() || liquido <= 0.0 {
            return OperationTier::BelowMinimum;
        }
        let cents = (liquido * 100.0).round() as i64;
        Self::DESCENDING
            .into_iter()
            .find(|tier| cents >= tier.min_net_income_cents())
            .unwrap_or(OperationTier::BelowMinimum)
    }

    pub fn is_eligible(self) -> bool {
        self != OperationTier::BelowMinimum
    }

    /// Label used in the prompt and expected back in `faixaOperacao`.
    pub fn label(self) -> &'static str {
        match self {
            OperationTier::BelowMinimum => "REPROVADO (Não atinge o mínimo de 100 reais)",
            OperationTier::UpTo2999 => "Liberado apenas para operações até R$ 2.999,99",
            OperationTier::From3000To14999 => {
                "Liberado para operações de R$ 3.000,00 a R$ 14.999,99"
            }
            OperationTier::From15000To49999 => {
                "Liberado para operações de R$ 15.000,00 a R$ 49.999,99"
            }
            OperationTier::From50000To195000 => {
                "Liberado para operações de R$ 50.000,00 até R$ 195.000,00"
            }
        }
    }

    /// Threshold as it appears in the prompt, e.g. `"R$ 1.000,00"`.
    pub fn threshold_display(self) -> String {
        crate::report::format_brl(self.min_net_income())
    }

    /// Recognise which tier a free-text `faixaOperacao` refers to.
    ///
    /// The model paraphrases ("Operações até R$ 14.999,99"), so this keys on
    /// the amounts that bound each band rather than the full label.
    pub fn from_label(text: &str) -> Option<Self> {
        let t = text.to_lowercase();
        if t.contains("195.000") || t.contains("50.000,00") {
            Some(OperationTier::From50000To195000)
        } else if t.contains("49.999") || t.contains("15.000,00") {
            Some(OperationTier::From15000To49999)
        } else if t.contains("14.999") || t.contains("3.000,00") {
            Some(OperationTier::From3000To14999)
        } else if t.contains("2.999") {
            Some(OperationTier::UpTo2999)
        } else {
            let folded = fold(text);
            if folded.contains("reprovado") || folded.contains("nao atinge") {
                Some(OperationTier::BelowMinimum)
            } else {
                None
            }
        }
    }
}

impl fmt::Display for OperationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Verdicts ─────────────────────────────────────────────────────────────

/// Outcome of a single role/status rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleVerdict {
    Accepted(AcceptReason),
    Rejected(RejectReason),
    /// The rule set does not cover this input.
    Undetermined,
}

impl RoleVerdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, RoleVerdict::Accepted(_))
    }

    pub fn is_rejected(self) -> bool {
        matches!(self, RoleVerdict::Rejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    ArmyCareer,
    ArmyCareerWithIndicatorOne,
    ArmyInactiveOrPensioner,
    SiapeStatus(SiapeStatus),
    SiapeTemporaryPensionerWithoutEndDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ArmyTemporary,
    ArmyTemporaryByIndicator,
    ArmyReinstatedByCourt,
    SiapeWithoutTenure(SiapeStatus),
    SiapeTemporaryPensionerWithEndDate,
    SiapeBlockedUpag(&'static str),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ArmyTemporary => f.write_str("militar temporário"),
            RejectReason::ArmyTemporaryByIndicator => {
                f.write_str("militar temporário (PREC 30/34 com IND 2 ou 3)")
            }
            RejectReason::ArmyReinstatedByCourt => f.write_str("reintegrado por justiça (PREC 37)"),
            RejectReason::SiapeWithoutTenure(s) => write!(f, "vínculo não atendido ({})", s.label()),
            RejectReason::SiapeTemporaryPensionerWithEndDate => {
                f.write_str("pensionista temporário com data de término")
            }
            RejectReason::SiapeBlockedUpag(u) => write!(f, "UPAG não atendida ({u})"),
        }
    }
}

// ── Army (PREC / CAT / IND) ──────────────────────────────────────────────

/// Career active PRECs, accepted.
pub const ARMY_CAREER_PRECS: [u32; 14] = [2, 4, 10, 12, 14, 22, 23, 24, 25, 26, 33, 36, 40, 60];
/// Inactive and pensioner PRECs, accepted.
pub const ARMY_INACTIVE_PRECS: [u32; 2] = [96, 98];
/// Temporary-service PRECs, always rejected.
pub const ARMY_TEMPORARY_PRECS: [u32; 3] = [35, 41, 43];
/// PRECs decided by the IND indicator: 1 accepts, 2 or 3 rejects.
pub const ARMY_INDICATOR_PRECS: [u32; 2] = [30, 34];
/// Reinstated by court order, always rejected.
pub const ARMY_REINSTATED_PREC: u32 = 37;

/// The PREC / CAT / IND triple printed on an army paycheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmyCode {
    pub prec: u32,
    pub cat: Option<u32>,
    pub ind: Option<u32>,
}

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

impl ArmyCode {
    /// Parse "34 / 1 / 2", "34/1/2", "PREC 34 CAT 1 IND 2" and the like.
    /// Numbers are taken in order: PREC, CAT, IND. A number that does not
    /// fit in `u32` makes the whole code unparseable.
    pub fn parse(text: &str) -> Option<Self> {
        let nums = RE_DIGITS
            .find_iter(text)
            .take(3)
            .map(|m| m.as_str().parse::<u32>().ok())
            .collect::<Option<Vec<u32>>>()?;
        let mut nums = nums.into_iter();
        let prec = nums.next()?;
        Some(Self {
            prec,
            cat: nums.next(),
            ind: nums.next(),
        })
    }

    pub fn verdict(&self) -> RoleVerdict {
        army_verdict(self.prec, self.ind)
    }
}

impl fmt::Display for ArmyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".into());
        write!(f, "PREC {} / CAT {} / IND {}", self.prec, opt(self.cat), opt(self.ind))
    }
}

/// Army eligibility for debt purchase from PREC and IND.
pub fn army_verdict(prec: u32, ind: Option<u32>) -> RoleVerdict {
    if prec == ARMY_REINSTATED_PREC {
        return RoleVerdict::Rejected(RejectReason::ArmyReinstatedByCourt);
    }
    if ARMY_TEMPORARY_PRECS.contains(&prec) {
        return RoleVerdict::Rejected(RejectReason::ArmyTemporary);
    }
    if ARMY_CAREER_PRECS.contains(&prec) {
        return RoleVerdict::Accepted(AcceptReason::ArmyCareer);
    }
    if ARMY_INACTIVE_PRECS.contains(&prec) {
        return RoleVerdict::Accepted(AcceptReason::ArmyInactiveOrPensioner);
    }
    if ARMY_INDICATOR_PRECS.contains(&prec) {
        return match ind {
            Some(1) => RoleVerdict::Accepted(AcceptReason::ArmyCareerWithIndicatorOne),
            Some(2) | Some(3) => RoleVerdict::Rejected(RejectReason::ArmyTemporaryByIndicator),
            _ => RoleVerdict::Undetermined,
        };
    }
    RoleVerdict::Undetermined
}

// ── SIAPE ────────────────────────────────────────────────────────────────

/// Functional status of a federal civil servant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiapeStatus {
    Active,
    Inactive,
    Retired,
    LifetimePensioner,
    TemporaryPensioner,
    /// CLT-salaried, without tenure.
    Celetista,
    Commissioned,
    Intern,
    Contractor,
}

impl SiapeStatus {
    pub fn label(self) -> &'static str {
        match self {
            SiapeStatus::Active => "Servidor Ativo",
            SiapeStatus::Inactive => "Servidor Inativo",
            SiapeStatus::Retired => "Aposentado",
            SiapeStatus::LifetimePensioner => "Pensionista Vitalício",
            SiapeStatus::TemporaryPensioner => "Pensionista Temporário",
            SiapeStatus::Celetista => "Celetista",
            SiapeStatus::Commissioned => "Comissionado",
            SiapeStatus::Intern => "Estagiário",
            SiapeStatus::Contractor => "Contratado sem vínculo",
        }
    }

    /// Recognise a status as printed on the paycheck.
    ///
    /// A bare "pensionista" is ambiguous between lifetime and temporary and
    /// yields `None`.
    pub fn from_label(text: &str) -> Option<Self> {
        let t = fold(text);
        let status = if t.contains("pensionista") {
            if t.contains("temporari") {
                SiapeStatus::TemporaryPensioner
            } else if t.contains("vitalici") {
                SiapeStatus::LifetimePensioner
            } else {
                return None;
            }
        } else if t.contains("inativ") {
            SiapeStatus::Inactive
        } else if t.contains("aposentad") {
            SiapeStatus::Retired
        } else if t.contains("celetista") {
            SiapeStatus::Celetista
        } else if t.contains("comissionad") {
            SiapeStatus::Commissioned
        } else if t.contains("estagiari") {
            SiapeStatus::Intern
        } else if t.contains("contratad") {
            SiapeStatus::Contractor
        } else if t.contains("ativ") {
            SiapeStatus::Active
        } else {
            return None;
        };
        Some(status)
    }
}

/// Payroll units excluded from the product regardless of status.
pub const BLOCKED_UPAGS: [&str; 9] = [
    "AMAZÔNIA AZUL",
    "CBTU",
    "CONAB",
    "EBSERH",
    "EMBRAPA",
    "DATAPREV",
    "INB",
    "VALEC",
    "Hospitais Clínicas",
];

/// Match a payroll-unit name against [`BLOCKED_UPAGS`].
///
/// Short acronyms must match a whole word ("INB" does not match "INBURSA").
/// Any "Hospital(is) de/das Clínicas" spelling counts as the last entry.
pub fn blocked_upag(upag: &str) -> Option<&'static str> {
    let padded = format!(" {} ", fold(upag));
    if padded.contains(" hospita") && padded.contains(" clinicas ") {
        return Some(BLOCKED_UPAGS[8]);
    }
    BLOCKED_UPAGS[..8]
        .iter()
        .copied()
        .find(|entry| padded.contains(&format!(" {} ", fold(entry))))
}

/// SIAPE eligibility for debt purchase.
pub fn siape_verdict(status: SiapeStatus, has_end_date: bool, upag: Option<&str>) -> RoleVerdict {
    if let Some(unit) = upag.and_then(blocked_upag) {
        return RoleVerdict::Rejected(RejectReason::SiapeBlockedUpag(unit));
    }
    match status {
        SiapeStatus::Active
        | SiapeStatus::Inactive
        | SiapeStatus::Retired
        | SiapeStatus::LifetimePensioner => RoleVerdict::Accepted(AcceptReason::SiapeStatus(status)),
        SiapeStatus::TemporaryPensioner if has_end_date => {
            RoleVerdict::Rejected(RejectReason::SiapeTemporaryPensionerWithEndDate)
        }
        SiapeStatus::TemporaryPensioner => {
            RoleVerdict::Accepted(AcceptReason::SiapeTemporaryPensionerWithoutEndDate)
        }
        SiapeStatus::Celetista
        | SiapeStatus::Commissioned
        | SiapeStatus::Intern
        | SiapeStatus::Contractor => RoleVerdict::Rejected(RejectReason::SiapeWithoutTenure(status)),
    }
}

// ── Blocked creditors ────────────────────────────────────────────────────

/// Lenders whose installments cannot be carried into a transfer.
pub const BLOCKED_CREDITORS: [&str; 9] = [
    "Capital Consig",
    "Ciasprev",
    "Eagle FHE MAT",
    "Futuro Previdência",
    "Hoje Previdência",
    "Inbursa",
    "Pecúlio União",
    "Sabemi",
    "Simpala",
];

/// The blocked creditor a debt line refers to, if any.
///
/// Case, accents and punctuation are ignored; the entry may appear anywhere
/// in the line ("BANCO INBURSA S.A." matches "Inbursa").
pub fn blocked_creditor(name: &str) -> Option<&'static str> {
    let folded = fold(name);
    if folded.is_empty() {
        return None;
    }
    BLOCKED_CREDITORS
        .iter()
        .copied()
        .find(|entry| folded.contains(&fold(entry)))
}

/// True iff at least one debt is owed to a blocked creditor.
pub fn has_blocked_creditor(debts: &[DebtRecord]) -> bool {
    debts.iter().any(|d| blocked_creditor(&d.banco).is_some())
}

// ── Text folding ─────────────────────────────────────────────────────────

/// Lowercase, strip Portuguese diacritics, turn punctuation into single spaces.
pub(crate) fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars().flat_map(char::to_lowercase) {
        let base = match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            c => c,
        };
        if base.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(base);
        } else {
            pending_space = true;
        }
    }
    out
}
