//! Doctor - Dependency checking

use anyhow::Result;
use colored::Colorize;

use crate::core::util::command_exists;

/// Dependency status
#[derive(Debug, Clone)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub required: bool,
    pub notes: Option<String>,
}

impl DependencyStatus {
    fn probe(name: &str, required: bool, notes: &str) -> Self {
        Self {
            name: name.to_string(),
            available: command_exists(name),
            required,
            notes: Some(notes.to_string()),
        }
    }

    pub fn to_line(&self) -> String {
        let status = if self.available {
            "✓".green()
        } else if self.required {
            "✗".red()
        } else {
            "✗".yellow()
        };
        let required = if self.required {
            "required"
        } else {
            "optional"
        };

        let mut line = format!(
            "{} {} ({}) - {}",
            status,
            self.name,
            required,
            if self.available { "found" } else { "not found" }
        );
        if let Some(notes) = &self.notes {
            line.push_str(&format!("\n  Note: {}", notes));
        }
        line
    }
}

/// Check all dependencies
pub fn check_dependencies() -> Vec<DependencyStatus> {
    vec![
        // grep (every backend searches with it except git)
        DependencyStatus::probe("grep", true, "Used for content search in plain and Subversion trees"),
        // git (optional, for Git working copies)
        DependencyStatus::probe("git", false, "Needed to browse Git working copies"),
        // svn (optional, for Subversion working copies)
        DependencyStatus::probe("svn", false, "Needed to browse Subversion working copies"),
    ]
}

/// Run the doctor command
pub fn run_doctor() -> Result<()> {
    let deps = check_dependencies();

    for dep in &deps {
        println!("{}", dep.to_line());
    }

    // Return error if any required dependency is missing
    if deps.iter().any(|d| d.required && !d.available) {
        anyhow::bail!("some required dependencies are missing");
    }

    Ok(())
}
