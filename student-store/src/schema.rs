//! Table layout and closed vocabularies of the exercise database.
//!
//! The text produced by [`describe_schema`] is what the query-generation
//! prompt shows the model, so it must stay in sync with the real tables.

use std::fmt::Write as _;

/// Course labels found in `alumnos.curso`. Free text in the database; these
/// are the values the frontend actually writes.
pub const KNOWN_COURSES: [&str; 6] = ["3 ano", "1º", "2º ESO", "1", "Fundamental", ""];

/// `ejercicios.dificultad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Hard,
    Normal,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Hard, Difficulty::Normal];

    /// Stored value.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Fácil",
            Difficulty::Hard => "Difícil",
            Difficulty::Normal => "Normal",
        }
    }
}

/// `ejercicios.tipo_ejercicio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseType {
    Displacement,
    MemoriseNumber,
    MatchFigures,
    Letters,
    MathOperations,
    EqualNumbers,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 6] = [
        ExerciseType::Displacement,
        ExerciseType::MemoriseNumber,
        ExerciseType::MatchFigures,
        ExerciseType::Letters,
        ExerciseType::MathOperations,
        ExerciseType::EqualNumbers,
    ];

    /// Stored value.
    pub fn as_db_str(self) -> &'static str {
        match self {
            ExerciseType::Displacement => "ejercicioDesplazamiento",
            ExerciseType::MemoriseNumber => "memoriseNumber",
            ExerciseType::MatchFigures => "matchFigures",
            ExerciseType::Letters => "ejercicioLetras",
            ExerciseType::MathOperations => "operacionesMatematicas",
            ExerciseType::EqualNumbers => "ejercicioNumerosIguales",
        }
    }
}

const STUDENTS_DDL: &str = "alumnos (
  id_alumno SERIAL PRIMARY KEY,
  email VARCHAR(100) UNIQUE NOT NULL,
  nombre VARCHAR(50) NOT NULL,
  apellidos VARCHAR(100) NOT NULL,
  genero VARCHAR(10),
  curso VARCHAR(20)
);";

const EXERCISES_DDL: &str = "ejercicios (
  id_ejercicio SERIAL PRIMARY KEY,
  id_alumno INTEGER REFERENCES alumnos(id_alumno),
  aciertos INTEGER NOT NULL,
  fallos INTEGER NOT NULL,
  letras_correctas INTEGER NOT NULL,
  date_inicio TIMESTAMP NOT NULL,
  date_fin TIMESTAMP NOT NULL,
  dificultad VARCHAR(50) NOT NULL,
  tipo_ejercicio VARCHAR(50) NOT NULL
);";

fn quoted<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders both tables plus their closed value sets as prompt text.
pub fn describe_schema() -> String {
    let mut out = String::new();
    out.push_str(STUDENTS_DDL);
    let _ = write!(
        out,
        "\n\n\"curso\" can be one of: {}.\n\n",
        quoted(KNOWN_COURSES)
    );
    out.push_str(EXERCISES_DDL);
    let _ = write!(
        out,
        "\n\n\"dificultad\" values: {}.\n\"tipo_ejercicio\" values: {}.\n",
        quoted(Difficulty::ALL.map(Difficulty::as_db_str)),
        quoted(ExerciseType::ALL.map(ExerciseType::as_db_str)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_every_closed_value() {
        let s = describe_schema();
        for d in Difficulty::ALL {
            assert!(s.contains(&format!("\"{}\"", d.as_db_str())));
        }
        for t in ExerciseType::ALL {
            assert!(s.contains(&format!("\"{}\"", t.as_db_str())));
        }
        assert!(s.contains("\"2º ESO\""));
        assert!(s.contains("id_alumno INTEGER REFERENCES alumnos(id_alumno)"));
    }
}
