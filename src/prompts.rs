//! The instruction text sent with every paycheck.
//!
//! The prompt is rendered once from the tables in [`crate::policy`], so
//! changing a PREC list or a blocked creditor there changes what the model is
//! told. The output is a constant for the life of the process: identical
//! input, identical instructions.

use once_cell::sync::Lazy;

use crate::policy::{
    OperationTier, ARMY_CAREER_PRECS, ARMY_INACTIVE_PRECS, ARMY_INDICATOR_PRECS,
    ARMY_REINSTATED_PREC, ARMY_TEMPORARY_PRECS, BLOCKED_CREDITORS, BLOCKED_UPAGS,
};

static AUDIT_PROMPT: Lazy<String> = Lazy::new(render_audit_prompt);

/// The auditor instructions, rendered from the policy tables.
pub fn audit_prompt() -> &'static str {
    &AUDIT_PROMPT
}

/// Appended for backends without native structured output: the schema is
/// restated inline and the model is told to answer with bare JSON.
pub fn json_only_suffix(schema: &serde_json::Value) -> String {
    format!(
        "\n\nResponda SOMENTE com um objeto JSON válido, sem comentários e sem blocos de código, \
seguindo exatamente este schema:\n{}",
        serde_json::to_string_pretty(schema).unwrap_or_default()
    )
}

fn join_codes(codes: &[u32]) -> String {
    codes
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_pair(codes: &[u32]) -> String {
    match codes {
        [a, b] => format!("{a} e {b}"),
        other => join_codes(other),
    }
}

fn render_audit_prompt() -> String {
    let tiers = [
        OperationTier::From50000To195000,
        OperationTier::From15000To49999,
        OperationTier::From3000To14999,
        OperationTier::UpTo2999,
    ]
    .iter()
    .map(|t| format!("- Líquido >= {} -> \"{}\"", t.threshold_display(), t.label()))
    .collect::<Vec<_>>()
    .join("\n");

    let floor = OperationTier::UpTo2999.threshold_display();
    let indicator = join_pair(&ARMY_INDICATOR_PRECS);

    format!(
        "Você é um Auditor Sênior Implacável de Crédito Consignado.
Analise a imagem/PDF otimizado deste contracheque e valide ESTRITAMENTE contra as seguintes regras de TRANSFERÊNCIA (COMPRA DE DÍVIDA):

[REGRA 1 - LÍQUIDO MÍNIMO OBRIGATÓRIO (Exército e SIAPE)]
Verifique o líquido recebido pelo cliente e classifique sua capacidade (use a MAIOR faixa cujo mínimo o líquido atinge):
{tiers}
- Líquido < {floor} -> REPROVADO (Não atinge o mínimo de 100 reais).

[REGRA 2 - EXÉRCITO: VALIDAÇÃO DE PREC, CAT E IND]
Para Transferência, TEMPORÁRIOS DO EXÉRCITO SÃO SUMARIAMENTE RECUSADOS. Reintegrados por Justiça (PREC {reinstated}) SÃO RECUSADOS.
- ATIVOS CARREIRA (ACEITOS): PRECs {career}. E PRECs {indicator} SOMENTE SE O 'IND' FOR 1.
- INATIVOS/PENSIONISTAS (ACEITOS): PREC {inactive}.
- TEMPORÁRIOS DO EXÉRCITO (RECUSAR PARA TRANSFER): PRECs {temporary}. E PRECs {indicator} SE O 'IND' FOR 2 OU 3.

[REGRA 3 - SIAPE: UPAGs E SITUAÇÕES ATENDIDAS / NÃO ATENDIDAS]
- ACEITOS: Servidores Ativos, Inativos, Aposentados e Pensionistas Vitalícios.
- PENSIONISTAS TEMPORÁRIOS SIAPE: SÃO ACEITOS, DESDE QUE NÃO exista uma data de término/prazo limite impressa no contracheque. Se houver data de término = RECUSAR. Se não houver data de término = ACEITAR.
- RECUSAR: Celetistas, Comissionados, Estagiários, Contratados sem vínculo.
- RECUSAR UPAGS: {upags}.

[REGRA 4 - BANCOS BLOQUEADOS NO TRANSFER]
Se NOME de qualquer dívida atual bater com esta lista, marque alertaBancosBloqueados = true:
{creditors}.

Gere o laudo sendo muito técnico, citando a regra que aprovou ou reprovou (ex: \"Reprovado pois PREC 34 IND 2 é militar temporário\", ou \"Aprovado: SIAPE Pensionista Temporário sem data de término\", ou \"Líquido de R$85 não atinge o mínimo de R$100\").",
        reinstated = ARMY_REINSTATED_PREC,
        career = join_codes(&ARMY_CAREER_PRECS),
        inactive = join_pair(&ARMY_INACTIVE_PRECS),
        temporary = join_codes(&ARMY_TEMPORARY_PRECS),
        upags = BLOCKED_UPAGS.join(", "),
        creditors = BLOCKED_CREDITORS.join(", "),
    )
}
