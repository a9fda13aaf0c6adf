use colored::Colorize;

use crate::analyzer::kubepolicy::{RuleId, Severity};

/// Render the rule catalog as a table.
pub fn render_rules() -> String {
    let mut output = format!(
        "{:<22} {:<8} {:<6} {}\n",
        "RULE".bold(),
        "SEVERITY".bold(),
        "PATCH".bold(),
        "DESCRIPTION".bold()
    );

    for rule in RuleId::ALL {
        let severity = match rule.severity() {
            Severity::Error => rule.severity().as_str().red(),
            Severity::Warning => rule.severity().as_str().yellow(),
        };
        let patch = if rule.is_patchable() { "yes" } else { "no" };
        output.push_str(&format!(
            "{:<22} {:<8} {:<6} {}\n",
            rule.as_str().cyan(),
            severity,
            patch,
            rule.description()
        ));
    }

    output
}

/// Handle `kubepolicy rules`.
pub fn handle_rules() -> crate::Result<()> {
    print!("{}", render_rules());
    Ok(())
}
