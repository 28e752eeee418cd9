use crate::download::strip_schema;
use phf::phf_map;

pub const DEFAULT_TARGET: &str = "maths";

/// Short names accepted in place of a catalogue's root url.
static CATALOGUE_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "maths" => "https://courses.maths.ox.ac.uk/course/index.php?categoryid=0",
    "math" => "https://courses.maths.ox.ac.uk/course/index.php?categoryid=0",
    "courses.maths.ox.ac.uk" => "https://courses.maths.ox.ac.uk/course/index.php?categoryid=0",
    "courses.maths.ox.ac.uk/course/index.php?categoryid=0" => "https://courses.maths.ox.ac.uk/course/index.php?categoryid=0",
    "cs" => "https://courses.cs.ox.ac.uk/course/index.php?categoryid=0",
    "compsci" => "https://courses.cs.ox.ac.uk/course/index.php?categoryid=0",
    "courses.cs.ox.ac.uk" => "https://courses.cs.ox.ac.uk/course/index.php?categoryid=0",
    "courses.cs.ox.ac.uk/course/index.php?categoryid=0" => "https://courses.cs.ox.ac.uk/course/index.php?categoryid=0",
};

/// Hosts that only serve their catalogue to a signed-in session.
const SSO_GATED_HOSTS: [&str; 1] = ["courses.cs.ox.ac.uk"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootTarget {
    pub url: String,
    pub requires_sso: bool,
}

/// Turns user input into the url the crawl starts from. Aliases are matched
/// case-insensitively and with or without a scheme, an empty input means
/// the maths catalogue, and a url without a scheme gets `http://`.
pub fn resolve_root(input: &str) -> RootTarget {
    let input = match input.trim() {
        "" => DEFAULT_TARGET,
        trimmed => trimmed,
    };
    let lowered = input.to_lowercase();

    let mut url = match CATALOGUE_ALIASES.get(strip_schema(&lowered)) {
        Some(root) => root.to_string(),
        None => input.to_string(),
    };

    let host = strip_schema(&url)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let requires_sso = SSO_GATED_HOSTS.contains(&host.as_str());

    if !url.to_lowercase().starts_with("http") {
        url = format!("http://{url}");
    }

    RootTarget { url, requires_sso }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_the_maths_catalogue() {
        let target = resolve_root("   ");
        assert_eq!(
            target.url,
            "https://courses.maths.ox.ac.uk/course/index.php?categoryid=0"
        );
        assert!(!target.requires_sso);
    }

    #[test]
    fn aliases_ignore_case_and_scheme() {
        assert_eq!(resolve_root("MATHS"), resolve_root("maths"));
        assert_eq!(
            resolve_root("https://courses.maths.ox.ac.uk").url,
            "https://courses.maths.ox.ac.uk/course/index.php?categoryid=0"
        );
    }

    #[test]
    fn computer_science_needs_sso() {
        let target = resolve_root("cs");
        assert_eq!(
            target.url,
            "https://courses.cs.ox.ac.uk/course/index.php?categoryid=0"
        );
        assert!(target.requires_sso);

        let course = resolve_root("https://courses.cs.ox.ac.uk/course/view.php?name=ai_2024_2025");
        assert!(course.requires_sso);
        assert_eq!(
            course.url,
            "https://courses.cs.ox.ac.uk/course/view.php?name=ai_2024_2025"
        );
    }

    #[test]
    fn urls_without_scheme_default_to_http() {
        let target = resolve_root("moodle.example.edu/course/index.php?categoryid=3");
        assert_eq!(
            target.url,
            "http://moodle.example.edu/course/index.php?categoryid=3"
        );
        assert!(!target.requires_sso);
    }

    #[test]
    fn course_names_keep_their_case() {
        let target = resolve_root("https://moodle.example.edu/course/view.php?name=AI_2024");
        assert_eq!(
            target.url,
            "https://moodle.example.edu/course/view.php?name=AI_2024"
        );
    }
}
