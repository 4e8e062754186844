//! The eligibility report returned by the model, and the metadata that
//! travels with it.
//!
//! Field names on the wire are the Portuguese camelCase keys the schema
//! declares (`legivel`, `dadosExtraidos`, …); the Rust side uses snake_case.
//! A report is created once per successful analysis and never mutated: the
//! advisory [`cross_check`] returns findings next to it instead of
//! correcting it.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::document::MediaType;
use crate::pipeline::enhance::Enhancement;
use crate::policy::{self, ArmyCode, OperationTier, RejectReason, RoleVerdict};

/// Structured verdict for one paycheck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityReport {
    /// Whether the document is legible and looks like a genuine paycheck.
    pub legivel: bool,
    /// "Exército", "SIAPE" or "Desconhecido".
    pub orgao: String,
    /// Eligible specifically for debt purchase (transfer).
    pub elegivel: bool,
    /// Any installment owed to a blocked creditor.
    pub alerta_bancos_bloqueados: bool,
    /// Technical justification naming the rule that decided the verdict.
    pub motivo: String,
    pub dados_extraidos: ExtractedData,
}

/// Fields read off the paycheck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    /// Army only: "PREC / CAT / IND".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prec_cat_ind: Option<String>,
    /// SIAPE only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matricula: Option<String>,
    /// Net income for the month, in reais.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquido: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faixa_operacao: Option<String>,
    /// Existing installment debts, in document order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dividas_identificadas: Vec<DebtRecord>,
}

/// One existing installment debt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub banco: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_parcela: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prazo_restante: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Institution a paycheck belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Institution {
    Army,
    Siape,
    Unknown,
}

impl Institution {
    /// Classify the free-text `orgao` field.
    pub fn from_orgao(orgao: &str) -> Self {
        let folded = policy::fold(orgao);
        if folded.contains("exercito") {
            Institution::Army
        } else if folded.contains("siape") {
            Institution::Siape
        } else {
            Institution::Unknown
        }
    }
}

impl EligibilityReport {
    pub fn institution(&self) -> Institution {
        Institution::from_orgao(&self.orgao)
    }

    /// Tier computed locally from the extracted net income.
    pub fn computed_tier(&self) -> Option<OperationTier> {
        self.dados_extraidos.liquido.map(OperationTier::for_net_income)
    }

    /// Net income below the R$ 100,00 floor.
    pub fn below_minimum_income(&self) -> bool {
        self.computed_tier() == Some(OperationTier::BelowMinimum)
    }
}

// ── Analysis result ──────────────────────────────────────────────────────

/// A validated report plus how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub report: EligibilityReport,
    /// Local rule checks that disagree with the model. Advisory only.
    pub findings: Vec<PolicyFinding>,
    /// Media type actually sent to the service.
    pub media_type: MediaType,
    pub enhancement: Enhancement,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub duration_ms: u64,
}

// ── Cross-check ──────────────────────────────────────────────────────────

/// A disagreement between the model's report and the local rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyFinding {
    /// `faixaOperacao` names a different tier than the net income supports.
    TierMismatch {
        liquido: f64,
        #[serde(serialize_with = "serialize_tier")]
        expected: OperationTier,
        #[serde(serialize_with = "serialize_tier")]
        reported: OperationTier,
    },
    /// `alertaBancosBloqueados` disagrees with the extracted debt list.
    BlockedCreditorFlagMismatch { expected: bool, reported: bool },
    /// Marked eligible with net income under the floor.
    EligibleBelowMinimum { liquido: f64 },
    /// Marked eligible although the PREC/IND rules reject the code.
    EligibleWithRejectedArmyCode { code: String, reason: String },
}

fn serialize_tier<S: serde::Serializer>(tier: &OperationTier, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(tier.label())
}

impl fmt::Display for PolicyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyFinding::TierMismatch {
                liquido,
                expected,
                reported,
            } => write!(
                f,
                "Faixa informada ({reported}) diverge da tabela para líquido de {}: {expected}",
                format_brl(*liquido)
            ),
            PolicyFinding::BlockedCreditorFlagMismatch { expected, reported } => write!(
                f,
                "Alerta de bancos bloqueados = {reported}, mas as dívidas extraídas indicam {expected}"
            ),
            PolicyFinding::EligibleBelowMinimum { liquido } => write!(
                f,
                "Marcado como elegível com líquido de {} (mínimo R$ 100,00)",
                format_brl(*liquido)
            ),
            PolicyFinding::EligibleWithRejectedArmyCode { code, reason } => {
                write!(f, "Marcado como elegível, mas {code} é {reason}")
            }
        }
    }
}

/// Compare the model's answer with the local policy tables.
pub fn cross_check(report: &EligibilityReport) -> Vec<PolicyFinding> {
    let data = &report.dados_extraidos;
    let mut findings = Vec::new();

    if let (Some(liquido), Some(faixa)) = (data.liquido, data.faixa_operacao.as_deref()) {
        let expected = OperationTier::for_net_income(liquido);
        if let Some(reported) = OperationTier::from_label(faixa) {
            if reported != expected {
                findings.push(PolicyFinding::TierMismatch {
                    liquido,
                    expected,
                    reported,
                });
            }
        }
    }

    let expected_alert = policy::has_blocked_creditor(&data.dividas_identificadas);
    if expected_alert != report.alerta_bancos_bloqueados {
        findings.push(PolicyFinding::BlockedCreditorFlagMismatch {
            expected: expected_alert,
            reported: report.alerta_bancos_bloqueados,
        });
    }

    if report.elegivel {
        if let Some(liquido) = data.liquido {
            if !OperationTier::for_net_income(liquido).is_eligible() {
                findings.push(PolicyFinding::EligibleBelowMinimum { liquido });
            }
        }

        if report.institution() == Institution::Army {
            if let Some(code) = data.prec_cat_ind.as_deref().and_then(ArmyCode::parse) {
                if let RoleVerdict::Rejected(reason) = code.verdict() {
                    findings.push(rejected_code(code, reason));
                }
            }
        }
    }

    findings
}

fn rejected_code(code: ArmyCode, reason: RejectReason) -> PolicyFinding {
    PolicyFinding::EligibleWithRejectedArmyCode {
        code: code.to_string(),
        reason: reason.to_string(),
    }
}

// ── Formatting ───────────────────────────────────────────────────────────

/// Format reais the pt-BR way: `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let int = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{sign}R$ {grouped},{frac:02}")
}
