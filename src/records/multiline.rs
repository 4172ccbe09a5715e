//! Multi-line diagnostic blocks. Only the first line is stamped.

use crate::fields::{pick, timestamp};
use chrono::{DateTime, Utc};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultilineTemplate {
    JavaStackTrace,
    PythonTraceback,
    TimestampedError,
    WarningBlock,
}

impl MultilineTemplate {
    pub const ALL: [MultilineTemplate; 4] = [
        MultilineTemplate::JavaStackTrace,
        MultilineTemplate::PythonTraceback,
        MultilineTemplate::TimestampedError,
        MultilineTemplate::WarningBlock,
    ];

    fn headline(&self) -> &'static str {
        match self {
            MultilineTemplate::JavaStackTrace => {
                "Exception in thread \"main\" java.lang.NullPointerException"
            }
            MultilineTemplate::PythonTraceback => "Traceback (most recent call last):",
            MultilineTemplate::TimestampedError => {
                "ERROR [com.example.MyClass] Something went wrong"
            }
            MultilineTemplate::WarningBlock => "WARN [com.example.MyClass] Possible issue detected",
        }
    }

    fn continuation(&self) -> &'static [&'static str] {
        match self {
            MultilineTemplate::JavaStackTrace => &[
                "    at com.example.myproject.Book.getTitle(Book.java:16)",
                "    at com.example.myproject.Author.getBookTitles(Author.java:25)",
                "    at com.example.myproject.Bootstrap.main(Bootstrap.java:14)",
            ],
            MultilineTemplate::PythonTraceback => &[
                "  File \"<stdin>\", line 1, in <module>",
                "  File \"<string>\", line 2, in <module>",
                "ValueError: math domain error",
            ],
            MultilineTemplate::TimestampedError => &[
                "java.lang.IllegalArgumentException: argument cannot be null",
                "    at com.example.MyClass.method(MyClass.java:50)",
                "    at com.example.MyClass.main(MyClass.java:30)",
            ],
            MultilineTemplate::WarningBlock => &[
                "    at com.example.MyClass.method(MyClass.java:40)",
                "    at com.example.MyClass.main(MyClass.java:20)",
            ],
        }
    }

    pub fn render(&self, timestamp: &str) -> Vec<String> {
        let mut lines = Vec::with_capacity(1 + self.continuation().len());
        lines.push(format!("{} {}", timestamp, self.headline()));
        lines.extend(self.continuation().iter().map(|line| line.to_string()));
        lines
    }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<String> {
    let template = *pick(rng, &MultilineTemplate::ALL);
    template.render(&timestamp(rng, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::TimestampFormat;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_template_line_counts() {
        assert_eq!(MultilineTemplate::JavaStackTrace.render("t").len(), 4);
        assert_eq!(MultilineTemplate::PythonTraceback.render("t").len(), 4);
        assert_eq!(MultilineTemplate::TimestampedError.render("t").len(), 4);
        assert_eq!(MultilineTemplate::WarningBlock.render("t").len(), 3);
    }

    #[test]
    fn test_only_first_line_is_stamped() {
        let now = Utc::now();
        let stamps: Vec<String> = TimestampFormat::ALL.iter().map(|f| f.render(now)).collect();
        let mut rng = StdRng::seed_from_u64(8);

        for _ in 0..200 {
            let lines = generate(&mut rng, now);
            assert!((3..=4).contains(&lines.len()));
            assert!(stamps.iter().any(|stamp| lines[0].starts_with(stamp.as_str())));
            for line in &lines[1..] {
                assert!(!stamps.iter().any(|stamp| line.contains(stamp.as_str())));
            }
        }
    }

    #[test]
    fn test_python_traceback_text() {
        let lines = MultilineTemplate::PythonTraceback.render("2024-06-18T12:00:00Z");
        assert_eq!(lines[0], "2024-06-18T12:00:00Z Traceback (most recent call last):");
        assert_eq!(lines[3], "ValueError: math domain error");
    }
}
