//! The student record schema.
//!
//! [`FIELDS`] is the single source of truth for the predictor columns: their
//! names (used verbatim as dataset headers and form control names), their
//! Portuguese labels, and the domain each one accepts. [`StudentRecord`] is the
//! statically typed row that the prediction form collects; it is turned into a
//! one-row [`DataFrame`] with exactly the column names and order used at
//! training time.
//!
//! # Example
//!
//! ```
//! use evasao_data::{FIELDS, StudentRecord};
//!
//! let mut record = StudentRecord::default();
//! record.nota_admissao = 17.5;
//! record.validate().expect("defaults are in range");
//!
//! let df = record.to_dataframe().unwrap();
//! assert_eq!(df.height(), 1);
//! assert_eq!(df.width(), FIELDS.len());
//! ```

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Column names, exactly as they appear in the training dataset.
pub mod columns {
    pub const ESTADO_CIVIL: &str = "EstadoCivil";
    pub const CURSO: &str = "Curso";
    pub const QUALIFICACAO_ANTERIOR: &str = "QualificacaoAnterior";
    pub const QUALIFICACAO_ANTERIOR_GRAU: &str = "QualificacaoAnteriorGrau";
    pub const NACIONALIDADE: &str = "Nacionalidade";
    pub const NOTA_ADMISSAO: &str = "NotaAdmissao";
    pub const NECESSIDADES_ESPECIAIS: &str = "NecessidadesEspeciais";
    pub const DEVEDOR: &str = "Devedor";
    pub const MENSALIDADES_EM_DIA: &str = "MensalidadesEmDia";
    pub const GENERO: &str = "Genero";
    pub const BOLSISTA: &str = "Bolsista";
    pub const INTERNATIONAL: &str = "International";
    pub const UC1_CREDITADO: &str = "UnidadesCurriculares1SemestreCreditado";
    pub const UC1_INSCRITO: &str = "UnidadesCurriculares1SemestreInscrito";
    pub const UC1_AVALIACOES: &str = "UnidadesCurriculares1SemestreAvaliacoes";
    pub const UC1_APROVADO: &str = "UnidadesCurriculares1SemestreAprovado";
    pub const UC1_GRAU: &str = "UnidadesCurriculares1SemestreGrau";
    pub const UC1_SEM_AVALIACOES: &str = "UnidadesCurriculares1SemestreSemAvaliacoes";
    pub const UC2_CREDITADO: &str = "UnidadesCurriculares2SemestreCreditado";
    pub const UC2_INSCRITO: &str = "UnidadesCurriculares2SemestreInscrito";
    pub const UC2_AVALIACOES: &str = "UnidadesCurriculares2SemestreAvaliacoes";
    pub const UC2_APROVADO: &str = "UnidadesCurriculares2SemestreAprovado";
    pub const UC2_GRAU: &str = "UnidadesCurriculares2SemestreGrau";
    pub const UC2_SEM_AVALIACOES: &str = "UnidadesCurriculares2SemestreSemAvaliacoes";
    pub const TAXA_DESEMPREGO: &str = "TaxaDesemprego";
    pub const TAXA_INFLACAO: &str = "TaxaInflacao";
    pub const PIB: &str = "PIB";
}

use columns::*;

pub const ESTADO_CIVIL_OPTIONS: &[&str] = &["Solteiro", "Casado", "Divorciado", "Viúvo"];

pub const CURSO_OPTIONS: &[&str] = &[
    "Design de Animação e Multimédia",
    "Turismo",
    "Design de Comunicação",
    "Jornalismo e Comunicação",
    "Serviço Social (prestação nocturna)",
    "Gestão (presencial noturno)",
    "Enfermagem",
    "Serviço Social",
    "Gestão de Publicidade e Marketing",
    "Ensino Básico",
    "Enfermagem Veterinária",
    "Equincultura",
    "Higiene Oral",
    "Gestão",
    "Agronomia",
    "Tecnologias de Produção de Biocombustíveis",
    "Engenharia Informática",
];

pub const QUALIFICACAO_ANTERIOR_OPTIONS: &[&str] = &[
    "Ensino Secundário",
    "Ensino Básico (3º Ciclo)",
    "Curso Técnico Superior Profissional",
    "Curso de Especialização Tecnológica",
    "11º Ano de Escolaridade - Não Concluído",
    "Ensino Superior - Licenciatura",
    "Ensino Superior - Licenciatura (1º Ciclo)",
    "Ensino Superior - Mestrado",
    "Outro - 11º Ano de Escolaridade",
    "Ensino Superior - Mestrado (2º Ciclo)",
    "10º Ano de Escolaridade - Não Concluído",
    "Frequência do Ensino Superior",
    "12º Ano de Escolaridade - Não Concluído",
    "Ensino Básico (2º Ciclo)",
    "Ensino Superior - Doutoramento",
    "10º Ano de Escolaridade",
];

pub const NACIONALIDADE_OPTIONS: &[&str] = &[
    "Português",
    "Romeno",
    "Espanhol",
    "Brasileiro",
    "Santomense",
    "Ucraniano",
    "Holandês",
    "Moçambicano",
    "Angolano",
    "Mexicano",
    "Italiano",
    "Cabo-verdiano",
    "Turco",
    "Moldávia (República da)",
    "Guineense",
    "Colombiano",
    "Alemão",
    "Cubano",
    "Russo",
    "Inglês",
    "Lituano",
];

pub const GENERO_OPTIONS: &[&str] = &["Masculino", "Feminino"];

/// The domain a predictor field accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Free text restricted to a closed list of options.
    Categorical { options: &'static [&'static str] },
    /// A 0/1 indicator, shown as a closed `[0, 1]` choice.
    Flag,
    /// A whole number within `[min, max]`.
    Integer { min: i64, max: i64, default: i64 },
    /// A real number within `[min, max]`.
    Decimal { min: f64, max: f64, default: f64 },
}

impl FieldKind {
    /// Whether the column is categorical at training time.
    ///
    /// Flags are stored as integers, so they are numeric to the model even
    /// though the form shows them as a choice list.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, FieldKind::Categorical { .. })
    }
}

/// Metadata for one predictor column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Column name in the dataset and form.
    pub column: &'static str,
    /// Label shown next to the input control.
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn categorical(
    column: &'static str,
    label: &'static str,
    options: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        column,
        label,
        kind: FieldKind::Categorical { options },
    }
}

const fn flag(column: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        column,
        label,
        kind: FieldKind::Flag,
    }
}

const fn integer(column: &'static str, label: &'static str, max: i64, default: i64) -> FieldSpec {
    FieldSpec {
        column,
        label,
        kind: FieldKind::Integer {
            min: 0,
            max,
            default,
        },
    }
}

const fn decimal(column: &'static str, label: &'static str, max: f64, default: f64) -> FieldSpec {
    FieldSpec {
        column,
        label,
        kind: FieldKind::Decimal {
            min: 0.0,
            max,
            default,
        },
    }
}

/// Number of predictor columns.
pub const FIELD_COUNT: usize = 27;

/// Every predictor column, in training order.
pub const FIELDS: [FieldSpec; FIELD_COUNT] = [
    categorical(ESTADO_CIVIL, "Estado Civil", ESTADO_CIVIL_OPTIONS),
    categorical(CURSO, "Curso", CURSO_OPTIONS),
    categorical(
        QUALIFICACAO_ANTERIOR,
        "Qualificação Anterior",
        QUALIFICACAO_ANTERIOR_OPTIONS,
    ),
    decimal(QUALIFICACAO_ANTERIOR_GRAU, "Grau da Qualificação Anterior", 20.0, 12.0),
    categorical(NACIONALIDADE, "Nacionalidade", NACIONALIDADE_OPTIONS),
    decimal(NOTA_ADMISSAO, "Nota de Admissão", 20.0, 10.0),
    flag(NECESSIDADES_ESPECIAIS, "Necessidades Especiais"),
    flag(DEVEDOR, "Devedor"),
    flag(MENSALIDADES_EM_DIA, "Mensalidades em Dia"),
    categorical(GENERO, "Gênero", GENERO_OPTIONS),
    flag(BOLSISTA, "Bolsista"),
    flag(INTERNATIONAL, "International"),
    integer(UC1_CREDITADO, "UC 1º Semestre Creditado", 10, 5),
    integer(UC1_INSCRITO, "UC 1º Semestre Inscrito", 10, 5),
    integer(UC1_AVALIACOES, "UC 1º Semestre Avaliações", 10, 5),
    integer(UC1_APROVADO, "UC 1º Semestre Aprovado", 10, 5),
    decimal(UC1_GRAU, "UC 1º Semestre Grau", 20.0, 10.0),
    integer(UC1_SEM_AVALIACOES, "UC 1º Semestre Sem Avaliações", 10, 0),
    integer(UC2_CREDITADO, "UC 2º Semestre Creditado", 10, 5),
    integer(UC2_INSCRITO, "UC 2º Semestre Inscrito", 10, 5),
    integer(UC2_AVALIACOES, "UC 2º Semestre Avaliações", 10, 5),
    integer(UC2_APROVADO, "UC 2º Semestre Aprovado", 10, 5),
    decimal(UC2_GRAU, "UC 2º Semestre Grau", 20.0, 10.0),
    integer(UC2_SEM_AVALIACOES, "UC 2º Semestre Sem Avaliações", 10, 0),
    decimal(TAXA_DESEMPREGO, "Taxa de Desemprego (%)", 100.0, 10.0),
    decimal(TAXA_INFLACAO, "Taxa de Inflação (%)", 100.0, 5.0),
    decimal(PIB, "PIB", 10.0, 1.0),
];

/// Look up a field by column name.
#[must_use]
pub fn field(column: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.column == column)
}

/// A single value taken from a [`StudentRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Decimal(f64),
}

impl std::fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Decimal(v) => write!(f, "{v}"),
        }
    }
}

/// One student's predictor values.
///
/// Field names serialize to the dataset column names, so an urlencoded form
/// or a JSON object keyed by column name deserializes straight into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StudentRecord {
    pub estado_civil: String,
    pub curso: String,
    pub qualificacao_anterior: String,
    pub qualificacao_anterior_grau: f64,
    pub nacionalidade: String,
    pub nota_admissao: f64,
    pub necessidades_especiais: i64,
    pub devedor: i64,
    pub mensalidades_em_dia: i64,
    pub genero: String,
    pub bolsista: i64,
    pub international: i64,
    pub unidades_curriculares1_semestre_creditado: i64,
    pub unidades_curriculares1_semestre_inscrito: i64,
    pub unidades_curriculares1_semestre_avaliacoes: i64,
    pub unidades_curriculares1_semestre_aprovado: i64,
    pub unidades_curriculares1_semestre_grau: f64,
    pub unidades_curriculares1_semestre_sem_avaliacoes: i64,
    pub unidades_curriculares2_semestre_creditado: i64,
    pub unidades_curriculares2_semestre_inscrito: i64,
    pub unidades_curriculares2_semestre_avaliacoes: i64,
    pub unidades_curriculares2_semestre_aprovado: i64,
    pub unidades_curriculares2_semestre_grau: f64,
    pub unidades_curriculares2_semestre_sem_avaliacoes: i64,
    pub taxa_desemprego: f64,
    pub taxa_inflacao: f64,
    #[serde(rename = "PIB")]
    pub pib: f64,
}

impl Default for StudentRecord {
    /// First option of every choice list, declared default of every number.
    fn default() -> Self {
        Self {
            estado_civil: ESTADO_CIVIL_OPTIONS[0].to_string(),
            curso: CURSO_OPTIONS[0].to_string(),
            qualificacao_anterior: QUALIFICACAO_ANTERIOR_OPTIONS[0].to_string(),
            qualificacao_anterior_grau: 12.0,
            nacionalidade: NACIONALIDADE_OPTIONS[0].to_string(),
            nota_admissao: 10.0,
            necessidades_especiais: 0,
            devedor: 0,
            mensalidades_em_dia: 0,
            genero: GENERO_OPTIONS[0].to_string(),
            bolsista: 0,
            international: 0,
            unidades_curriculares1_semestre_creditado: 5,
            unidades_curriculares1_semestre_inscrito: 5,
            unidades_curriculares1_semestre_avaliacoes: 5,
            unidades_curriculares1_semestre_aprovado: 5,
            unidades_curriculares1_semestre_grau: 10.0,
            unidades_curriculares1_semestre_sem_avaliacoes: 0,
            unidades_curriculares2_semestre_creditado: 5,
            unidades_curriculares2_semestre_inscrito: 5,
            unidades_curriculares2_semestre_avaliacoes: 5,
            unidades_curriculares2_semestre_aprovado: 5,
            unidades_curriculares2_semestre_grau: 10.0,
            unidades_curriculares2_semestre_sem_avaliacoes: 0,
            taxa_desemprego: 10.0,
            taxa_inflacao: 5.0,
            pib: 1.0,
        }
    }
}

impl StudentRecord {
    /// All values paired with their column names, in [`FIELDS`] order.
    #[must_use]
    pub fn values(&self) -> [(&'static str, FieldValue<'_>); FIELD_COUNT] {
        use FieldValue::{Decimal, Integer, Text};
        [
            (ESTADO_CIVIL, Text(&self.estado_civil)),
            (CURSO, Text(&self.curso)),
            (QUALIFICACAO_ANTERIOR, Text(&self.qualificacao_anterior)),
            (QUALIFICACAO_ANTERIOR_GRAU, Decimal(self.qualificacao_anterior_grau)),
            (NACIONALIDADE, Text(&self.nacionalidade)),
            (NOTA_ADMISSAO, Decimal(self.nota_admissao)),
            (NECESSIDADES_ESPECIAIS, Integer(self.necessidades_especiais)),
            (DEVEDOR, Integer(self.devedor)),
            (MENSALIDADES_EM_DIA, Integer(self.mensalidades_em_dia)),
            (GENERO, Text(&self.genero)),
            (BOLSISTA, Integer(self.bolsista)),
            (INTERNATIONAL, Integer(self.international)),
            (UC1_CREDITADO, Integer(self.unidades_curriculares1_semestre_creditado)),
            (UC1_INSCRITO, Integer(self.unidades_curriculares1_semestre_inscrito)),
            (UC1_AVALIACOES, Integer(self.unidades_curriculares1_semestre_avaliacoes)),
            (UC1_APROVADO, Integer(self.unidades_curriculares1_semestre_aprovado)),
            (UC1_GRAU, Decimal(self.unidades_curriculares1_semestre_grau)),
            (UC1_SEM_AVALIACOES, Integer(self.unidades_curriculares1_semestre_sem_avaliacoes)),
            (UC2_CREDITADO, Integer(self.unidades_curriculares2_semestre_creditado)),
            (UC2_INSCRITO, Integer(self.unidades_curriculares2_semestre_inscrito)),
            (UC2_AVALIACOES, Integer(self.unidades_curriculares2_semestre_avaliacoes)),
            (UC2_APROVADO, Integer(self.unidades_curriculares2_semestre_aprovado)),
            (UC2_GRAU, Decimal(self.unidades_curriculares2_semestre_grau)),
            (UC2_SEM_AVALIACOES, Integer(self.unidades_curriculares2_semestre_sem_avaliacoes)),
            (TAXA_DESEMPREGO, Decimal(self.taxa_desemprego)),
            (TAXA_INFLACAO, Decimal(self.taxa_inflacao)),
            (PIB, Decimal(self.pib)),
        ]
    }

    /// The value stored under `column`, if it is a predictor column.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<FieldValue<'_>> {
        self.values()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Check every field against its declared domain.
    ///
    /// These are the same constraints the form controls enforce; nothing
    /// stricter is applied.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidField`] for the first violating field.
    pub fn validate(&self) -> Result<()> {
        for (spec, (column, value)) in FIELDS.iter().zip(self.values()) {
            debug_assert_eq!(spec.column, column);
            check_field(spec, value)?;
        }
        Ok(())
    }

    /// Assemble the record into a one-row table with the training column
    /// names and order.
    ///
    /// # Errors
    ///
    /// Propagates polars construction errors.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .values()
            .into_iter()
            .map(|(name, value)| match value {
                FieldValue::Text(s) => Column::new(name.into(), &[s]),
                FieldValue::Integer(v) => Column::new(name.into(), &[v]),
                FieldValue::Decimal(v) => Column::new(name.into(), &[v]),
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

fn invalid(spec: &FieldSpec, reason: impl Into<String>) -> DataError {
    DataError::InvalidField {
        field: spec.column.to_string(),
        reason: reason.into(),
    }
}

fn check_field(spec: &FieldSpec, value: FieldValue<'_>) -> Result<()> {
    match (spec.kind, value) {
        (FieldKind::Categorical { options }, FieldValue::Text(s)) => {
            if options.iter().any(|option| *option == s) {
                Ok(())
            } else {
                Err(invalid(spec, format!("'{s}' is not one of the listed options")))
            }
        }
        (FieldKind::Flag, FieldValue::Integer(v)) => {
            if v == 0 || v == 1 {
                Ok(())
            } else {
                Err(invalid(spec, format!("{v} must be 0 or 1")))
            }
        }
        (FieldKind::Integer { min, max, .. }, FieldValue::Integer(v)) => {
            if (min..=max).contains(&v) {
                Ok(())
            } else {
                Err(invalid(spec, format!("{v} is outside [{min}, {max}]")))
            }
        }
        (FieldKind::Decimal { min, max, .. }, FieldValue::Decimal(v)) => {
            if v.is_finite() && (min..=max).contains(&v) {
                Ok(())
            } else {
                Err(invalid(spec, format!("{v} is outside [{min}, {max}]")))
            }
        }
        (kind, value) => Err(invalid(
            spec,
            format!("value {value} does not match field kind {kind:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_fields_have_unique_columns() {
        let names: HashSet<_> = FIELDS.iter().map(|f| f.column).collect();
        assert_eq!(names.len(), FIELD_COUNT);
    }

    #[test]
    fn test_values_follow_field_order() {
        let record = StudentRecord::default();
        let record_columns: Vec<_> = record.values().iter().map(|(c, _)| *c).collect();
        let schema_columns: Vec<_> = FIELDS.iter().map(|f| f.column).collect();
        assert_eq!(record_columns, schema_columns);
    }

    #[test]
    fn test_value_kinds_match_schema() {
        let record = StudentRecord::default();
        for (spec, (_, value)) in FIELDS.iter().zip(record.values()) {
            let ok = matches!(
                (spec.kind, value),
                (FieldKind::Categorical { .. }, FieldValue::Text(_))
                    | (FieldKind::Flag, FieldValue::Integer(_))
                    | (FieldKind::Integer { .. }, FieldValue::Integer(_))
                    | (FieldKind::Decimal { .. }, FieldValue::Decimal(_))
            );
            assert!(ok, "kind mismatch for {}", spec.column);
        }
    }

    #[test]
    fn test_defaults_match_declared_defaults() {
        let record = StudentRecord::default();
        for spec in &FIELDS {
            let value = record.value(spec.column).unwrap();
            match spec.kind {
                FieldKind::Categorical { options } => {
                    assert_eq!(value, FieldValue::Text(options[0]))
                }
                FieldKind::Flag => assert_eq!(value, FieldValue::Integer(0)),
                FieldKind::Integer { default, .. } => {
                    assert_eq!(value, FieldValue::Integer(default))
                }
                FieldKind::Decimal { default, .. } => {
                    assert_eq!(value, FieldValue::Decimal(default))
                }
            }
        }
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_option() {
        let record = StudentRecord {
            curso: "Astronomia".to_string(),
            ..StudentRecord::default()
        };
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("Curso"));
        assert_eq!(err.error_code(), "INVALID_FIELD");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let record = StudentRecord {
            nota_admissao: 20.5,
            ..StudentRecord::default()
        };
        assert!(record.validate().is_err());

        let record = StudentRecord {
            devedor: 2,
            ..StudentRecord::default()
        };
        assert!(record.validate().is_err());

        let record = StudentRecord {
            unidades_curriculares2_semestre_inscrito: 11,
            ..StudentRecord::default()
        };
        assert!(record.validate().is_err());

        let record = StudentRecord {
            pib: f64::NAN,
            ..StudentRecord::default()
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let record = StudentRecord {
            nota_admissao: 20.0,
            taxa_desemprego: 0.0,
            unidades_curriculares1_semestre_aprovado: 10,
            bolsista: 1,
            ..StudentRecord::default()
        };
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_to_dataframe_columns_and_types() {
        let df = StudentRecord::default().to_dataframe().unwrap();
        assert_eq!(df.height(), 1);

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let expected: Vec<String> = FIELDS.iter().map(|f| f.column.to_string()).collect();
        assert_eq!(names, expected);

        assert_eq!(df.column(CURSO).unwrap().dtype(), &DataType::String);
        assert_eq!(df.column(DEVEDOR).unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column(NOTA_ADMISSAO).unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_serde_uses_column_names() {
        let json = serde_json::to_value(StudentRecord::default()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), FIELD_COUNT);
        for spec in &FIELDS {
            assert!(object.contains_key(spec.column), "missing {}", spec.column);
        }
    }

    #[test]
    fn test_field_lookup() {
        let spec = field(NOTA_ADMISSAO).unwrap();
        assert_eq!(spec.label, "Nota de Admissão");
        assert!(!spec.kind.is_categorical());
        assert!(field(GENERO).unwrap().kind.is_categorical());
        assert!(field("Target").is_none());
    }
}
