use crate::model::Model;
use crate::relation::Relation;
use crate::variable::VariableList;
use reweave_error::{Error, Result};

/// Parse model notation: `model := relation (":" relation)+` where a
/// relation is a run of variable abbreviations. Matching is
/// case-insensitive and greedy: at each position the longest abbreviation
/// that matches wins, so multi-character abbreviations work alongside
/// single characters.
pub fn parse_model(text: &str, vars: &VariableList) -> Result<Model> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("empty model string"));
    }

    let mut relations = Vec::new();
    for part in trimmed.split(':') {
        let token = part.trim();
        if token.is_empty() {
            return Err(Error::validation(format!(
                "malformed model string '{}': empty relation",
                text
            )));
        }
        relations.push(parse_relation(token, vars)?);
    }
    Ok(Model::new(relations))
}

fn parse_relation(token: &str, vars: &VariableList) -> Result<Relation> {
    let lowered = token.to_lowercase();
    let mut positions = Vec::new();
    let mut rest = lowered.as_str();

    while !rest.is_empty() {
        let mut matched = None;
        for (i, var) in vars.iter().enumerate() {
            let abbrev = var.abbrev.to_lowercase();
            if rest.starts_with(&abbrev) {
                let longer = matched
                    .map(|(_, len)| abbrev.len() > len)
                    .unwrap_or(true);
                if longer {
                    matched = Some((i, abbrev.len()));
                }
            }
        }
        match matched {
            Some((position, len)) => {
                positions.push(position);
                rest = &rest[len..];
            }
            None => {
                return Err(Error::validation(format!(
                    "unrecognized abbreviation at '{}' in relation '{}'",
                    rest, token
                )));
            }
        }
    }
    Ok(Relation::new(positions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> VariableList {
        let mut vars = VariableList::new();
        for (name, ab) in [("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")] {
            vars.push(name, ab, 2, false).unwrap();
        }
        vars
    }

    #[test]
    fn parses_and_canonicalizes() {
        let vars = abcd();
        let model = parse_model("BA:cb", &vars).unwrap();
        assert_eq!(model.name(&vars), "ab:bc");
    }

    #[test]
    fn round_trips_through_canonical_name() {
        let vars = abcd();
        let model = parse_model("ab:bc:cd", &vars).unwrap();
        let reparsed = parse_model(&model.name(&vars), &vars).unwrap();
        assert_eq!(model, reparsed);
    }

    #[test]
    fn greedy_longest_match_wins() {
        let mut vars = VariableList::new();
        vars.push("Income", "i", 3, false).unwrap();
        vars.push("IncomeVolatility", "iv", 2, false).unwrap();
        vars.push("Balance", "b", 2, false).unwrap();
        let model = parse_model("ivi:b", &vars).unwrap();
        // "ivi" tokenizes as iv + i, not i + v + i
        assert_eq!(model.relations()[0].positions(), &[0, 1]);
        assert_eq!(model.name(&vars), "b:iiv");
    }

    #[test]
    fn unknown_abbreviation_names_the_offender() {
        let vars = abcd();
        let err = parse_model("ab:bq", &vars).unwrap_err();
        assert!(err.to_string().contains('q'));
    }

    #[test]
    fn empty_relation_is_malformed() {
        let vars = abcd();
        assert!(parse_model("ab::bc", &vars).is_err());
        assert!(parse_model("", &vars).is_err());
    }

    #[test]
    fn subset_relations_vanish_on_parse() {
        let vars = abcd();
        let model = parse_model("abc:ab:d", &vars).unwrap();
        assert_eq!(model.name(&vars), "abc:d");
    }
}
