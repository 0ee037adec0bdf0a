use crate::model::generated::GeneratedItem;

/// An editable column of a generated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Description,
    Estimate,
    Remaining,
    Activity,
    AssignedTo,
    Points,
    Criteria,
    Area,
    Iteration,
    Cmdb,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Title,
        Column::Description,
        Column::Estimate,
        Column::Remaining,
        Column::Activity,
        Column::AssignedTo,
        Column::Points,
        Column::Criteria,
        Column::Area,
        Column::Iteration,
        Column::Cmdb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Title => "title",
            Column::Description => "description",
            Column::Estimate => "estimate",
            Column::Remaining => "remaining",
            Column::Activity => "activity",
            Column::AssignedTo => "assigned",
            Column::Points => "points",
            Column::Criteria => "criteria",
            Column::Area => "area",
            Column::Iteration => "iteration",
            Column::Cmdb => "cmdb",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let s = s.to_ascii_lowercase();
        Column::ALL.into_iter().find(|c| c.name() == s).or(match s.as_str() {
            "desc" => Some(Column::Description),
            "hours" | "est" => Some(Column::Estimate),
            "assignee" | "assign" => Some(Column::AssignedTo),
            "sp" => Some(Column::Points),
            "ac" => Some(Column::Criteria),
            "sprint" => Some(Column::Iteration),
            _ => None,
        })
    }

    /// Write `value` into this column of `row`. An empty value clears optional columns.
    pub fn apply(self, row: &mut GeneratedItem, value: &str) -> Result<(), String> {
        let value = value.trim();
        let text = || (!value.is_empty()).then(|| value.to_string());
        let number = || -> Result<Option<f64>, String> {
            if value.is_empty() {
                return Ok(None);
            }
            match value.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(format!("{} must be a number, got '{value}'", self.name())),
            }
        };

        match self {
            Column::Title => {
                if value.is_empty() {
                    return Err("title cannot be empty".into());
                }
                row.title = value.to_string();
            }
            Column::Description => row.description = value.to_string(),
            Column::Estimate => row.original_estimate = number()?,
            Column::Remaining => row.remaining_work = number()?,
            Column::Activity => row.activity = text(),
            Column::AssignedTo => row.assigned_to = text(),
            Column::Points => row.story_points = number()?,
            Column::Criteria => row.acceptance_criteria = text(),
            Column::Area => row.area_path = text(),
            Column::Iteration => row.iteration_path = text(),
            Column::Cmdb => row.cmdb_app_name = text(),
        }
        Ok(())
    }
}

/// A line typed into the command bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(u64),
    Set { column: Column, value: String },
    Add(String),
    Delete,
    Say(String),
    Sprints(String),
    Replicate,
    Rank,
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "load" => rest
            .trim_start_matches('#')
            .parse()
            .map(Command::Load)
            .map_err(|_| format!("usage: load <id> (got '{rest}')")),
        "set" => {
            let (col, value) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            let column = Column::parse(col).ok_or_else(|| {
                let names: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
                format!("unknown column '{col}', expected one of {}", names.join(", "))
            })?;
            Ok(Command::Set {
                column,
                value: value.trim().to_string(),
            })
        }
        "add" | "new" if !rest.is_empty() => Ok(Command::Add(rest.to_string())),
        "del" | "delete" | "rm" => Ok(Command::Delete),
        "say" if !rest.is_empty() => Ok(Command::Say(rest.to_string())),
        "sprints" if !rest.is_empty() => Ok(Command::Sprints(rest.to_string())),
        "replicate" => Ok(Command::Replicate),
        "rank" => Ok(Command::Rank),
        "add" | "new" => Err("usage: add <title>".into()),
        "say" => Err("usage: say [user:|ai:] <text>".into()),
        "sprints" => Err("usage: sprints <iteration path>".into()),
        "" => Err("empty command".into()),
        other => Err(format!("unknown command '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_with_or_without_hash() {
        assert_eq!(parse_command("load 123"), Ok(Command::Load(123)));
        assert_eq!(parse_command("  load #77 "), Ok(Command::Load(77)));
        assert!(parse_command("load abc").is_err());
    }

    #[test]
    fn set_keeps_spaces_in_value() {
        assert_eq!(
            parse_command("set title Wire up the export job"),
            Ok(Command::Set {
                column: Column::Title,
                value: "Wire up the export job".into()
            })
        );
        assert_eq!(
            parse_command("set sprint Platts\\Scrum\\26.03"),
            Ok(Command::Set {
                column: Column::Iteration,
                value: "Platts\\Scrum\\26.03".into()
            })
        );
    }

    #[test]
    fn unknown_column_lists_choices() {
        let err = parse_command("set colour red").unwrap_err();
        assert!(err.contains("colour"));
        assert!(err.contains("estimate"));
    }

    #[test]
    fn verbs_without_arguments() {
        assert_eq!(parse_command("del"), Ok(Command::Delete));
        assert_eq!(parse_command("replicate"), Ok(Command::Replicate));
        assert_eq!(parse_command("RANK"), Ok(Command::Rank));
        assert!(parse_command("say").is_err());
        assert!(parse_command("sprints").is_err());
        assert!(parse_command("").is_err());
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn apply_parses_numbers_and_clears_optionals() {
        let mut row = GeneratedItem::new("Build");
        Column::Estimate.apply(&mut row, "4.5").unwrap();
        assert_eq!(row.original_estimate, Some(4.5));

        Column::Activity.apply(&mut row, "Design").unwrap();
        Column::Activity.apply(&mut row, "").unwrap();
        assert_eq!(row.activity, None);

        let err = Column::Points.apply(&mut row, "lots").unwrap_err();
        assert!(err.contains("points"));
        assert!(Column::Title.apply(&mut row, " ").is_err());
        assert_eq!(row.title, "Build");
    }

    #[test]
    fn apply_rejects_non_finite_numbers() {
        let mut row = GeneratedItem::new("Build");
        Column::Estimate.apply(&mut row, "3").unwrap();
        for bad in ["NaN", "inf", "-infinity"] {
            let err = Column::Estimate.apply(&mut row, bad).unwrap_err();
            assert!(err.contains("must be a number"));
        }
        assert_eq!(row.original_estimate, Some(3.0));
    }
}
