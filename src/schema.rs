//! Structured-output contract for the eligibility report.
//!
//! The schema constrains the model to emit JSON with exactly the shape of
//! [`crate::report::EligibilityReport`]. It uses the OpenAPI-subset dialect
//! the generative-model API expects (`"OBJECT"`, `"STRING"`, …) and
//! `propertyOrdering` so the serialisation order is deterministic.
//!
//! The same [`REQUIRED_FIELDS`] list drives the local validation gate in
//! [`crate::pipeline::parse`]: the schema is a request to the model, the
//! gate is what actually enforces it.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Schema version. Must match [`crate::policy::POLICY_VERSION`].
pub const SCHEMA_VERSION: &str = "2024.11-transfer";

/// Top-level fields every report must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "legivel",
    "orgao",
    "elegivel",
    "alertaBancosBloqueados",
    "motivo",
    "dadosExtraidos",
];

/// Serialisation order of the extracted-data object.
pub const EXTRACTED_FIELD_ORDER: [&str; 7] = [
    "nome",
    "cpf",
    "precCatInd",
    "matricula",
    "liquido",
    "faixaOperacao",
    "dividasIdentificadas",
];

/// Serialisation order of one debt record.
pub const DEBT_FIELD_ORDER: [&str; 3] = ["banco", "valorParcela", "prazoRestante"];

static REPORT_SCHEMA: Lazy<Value> = Lazy::new(build_schema);

/// The report schema, built once.
pub fn report_schema() -> &'static Value {
    &REPORT_SCHEMA
}

fn build_schema() -> Value {
    let debt = json!({
        "type": "OBJECT",
        "properties": {
            "banco": { "type": "STRING" },
            "valorParcela": { "type": "NUMBER" },
            "prazoRestante": { "type": "STRING" }
        },
        "propertyOrdering": DEBT_FIELD_ORDER
    });

    let extracted = json!({
        "type": "OBJECT",
        "properties": {
            "nome": { "type": "STRING" },
            "cpf": { "type": "STRING" },
            "precCatInd": {
                "type": "STRING",
                "description": "Se Exército, extraia o PREC, CAT e IND obrigatoriamente (ex: 34 / 1 / 2)."
            },
            "matricula": {
                "type": "STRING",
                "description": "Se SIAPE, extraia a Matrícula."
            },
            "liquido": {
                "type": "NUMBER",
                "description": "Valor líquido final recebido no mês."
            },
            "faixaOperacao": {
                "type": "STRING",
                "description": "Baseado no líquido, informe qual faixa de operação ele suporta (ex: 'Operações até R$ 14.999,99')"
            },
            "dividasIdentificadas": {
                "type": "ARRAY",
                "items": debt
            }
        },
        "propertyOrdering": EXTRACTED_FIELD_ORDER
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "legivel": {
                "type": "BOOLEAN",
                "description": "O documento é legível e parece ser um contracheque válido?"
            },
            "orgao": {
                "type": "STRING",
                "description": "Identifique o órgão: 'Exército', 'SIAPE' ou 'Desconhecido'"
            },
            "elegivel": {
                "type": "BOOLEAN",
                "description": "O cliente é elegível ESPECIFICAMENTE para a operação de Compra de Dívida (Transfer)?"
            },
            "alertaBancosBloqueados": {
                "type": "BOOLEAN",
                "description": "Verdadeiro se houver qualquer desconto referente aos bancos NÃO aceitos no transfer."
            },
            "motivo": {
                "type": "STRING",
                "description": "Laudo completo com foco em COMPRA DE DÍVIDA: justificando a decisão baseado no Líquido Mínimo da tabela, status funcional (Temporários não passam, exceto SIAPE sem data fim), e bancos."
            },
            "dadosExtraidos": extracted
        },
        "propertyOrdering": REQUIRED_FIELDS,
        "required": REQUIRED_FIELDS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(v: &Value) -> Vec<String> {
        let mut k: Vec<String> = v["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        k.sort();
        k
    }

    fn ordering(v: &Value) -> Vec<String> {
        v["propertyOrdering"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn versions_move_together() {
        assert_eq!(SCHEMA_VERSION, crate::policy::POLICY_VERSION);
    }

    #[test]
    fn all_top_level_fields_required() {
        let s = report_schema();
        let required: Vec<&str> = s["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, REQUIRED_FIELDS);
    }

    #[test]
    fn ordering_covers_every_property() {
        let s = report_schema();
        let extracted = &s["properties"]["dadosExtraidos"];
        let debt = &extracted["properties"]["dividasIdentificadas"]["items"];

        for obj in [s, extracted, debt] {
            let mut ord = ordering(obj);
            ord.sort();
            assert_eq!(ord, keys(obj));
        }
        assert_eq!(ordering(debt), DEBT_FIELD_ORDER);
        assert_eq!(ordering(extracted), EXTRACTED_FIELD_ORDER);
    }

    #[test]
    fn field_types() {
        let p = &report_schema()["properties"];
        assert_eq!(p["legivel"]["type"], "BOOLEAN");
        assert_eq!(p["orgao"]["type"], "STRING");
        assert_eq!(p["alertaBancosBloqueados"]["type"], "BOOLEAN");
        assert_eq!(p["dadosExtraidos"]["type"], "OBJECT");
        assert_eq!(p["dadosExtraidos"]["properties"]["liquido"]["type"], "NUMBER");
        assert_eq!(
            p["dadosExtraidos"]["properties"]["dividasIdentificadas"]["type"],
            "ARRAY"
        );
    }

    #[test]
    fn serialisation_is_stable() {
        let a = serde_json::to_string(report_schema()).unwrap();
        let b = serde_json::to_string(&build_schema()).unwrap();
        assert_eq!(a, b);
    }
}
