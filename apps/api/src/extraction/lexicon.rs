//! Skill Lexicon — the static table of canonical skill names and their
//! textual variants. Constructed once at startup and injected by `Arc`;
//! never accessed as a module-level global, so tests can run against
//! alternate lexicons.

use serde::{Deserialize, Serialize};

/// A canonical skill name plus any explicit extra variants it matches under.
///
/// Beyond the extras, every skill automatically matches its case-folded
/// canonical form and, for multi-word names, the space-removed, hyphenated,
/// and underscored renderings ("machine learning" / "machinelearning" /
/// "machine-learning" / "machine_learning").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub canonical: String,
    #[serde(default)]
    pub extra_variants: Vec<String>,
}

impl Skill {
    pub fn new(canonical: &str) -> Self {
        Self {
            canonical: canonical.to_string(),
            extra_variants: Vec::new(),
        }
    }

    pub fn with_variants(canonical: &str, extras: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            extra_variants: extras.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// All lower-cased textual forms this skill is matched under.
    pub fn variants(&self) -> Vec<String> {
        let folded = self.canonical.to_lowercase();
        let mut out = vec![folded.clone()];
        if folded.contains(' ') {
            out.push(folded.replace(' ', ""));
            out.push(folded.replace(' ', "-"));
            out.push(folded.replace(' ', "_"));
        }
        for extra in &self.extra_variants {
            out.push(extra.to_lowercase());
        }
        out.sort();
        out.dedup();
        out
    }
}

/// Immutable, load-once collection of [`Skill`]s.
#[derive(Debug, Clone, Default)]
pub struct SkillLexicon {
    skills: Vec<Skill>,
}

impl SkillLexicon {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    /// Convenience constructor for lexicons with no explicit extra variants.
    pub fn from_names(names: &[&str]) -> Self {
        Self::new(names.iter().map(|n| Skill::new(n)).collect())
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// The built-in skills table, grouped roughly by category.
    pub fn builtin() -> Self {
        let mut skills: Vec<Skill> = Vec::new();

        // Programming languages
        for name in [
            "Python", "Java", "JavaScript", "TypeScript", "C++", "C#", "Go", "Rust", "PHP",
            "Ruby", "Swift", "Kotlin", "Scala", "R", "MATLAB", "Perl", "Dart",
        ] {
            skills.push(Skill::new(name));
        }

        // Frameworks
        skills.push(Skill::with_variants("Node.js", &["nodejs", "node js"]));
        skills.push(Skill::with_variants("Vue.js", &["vuejs", "vue js"]));
        skills.push(Skill::with_variants("Next.js", &["nextjs", "next js"]));
        skills.push(Skill::with_variants("Nuxt.js", &["nuxtjs", "nuxt js"]));
        for name in [
            "React", "Angular", "Express", "Django", "Flask", "Spring", "Laravel",
            "Ruby on Rails", "ASP.NET", "FastAPI", "Svelte", "Ember.js",
        ] {
            skills.push(Skill::new(name));
        }

        // Databases
        for name in [
            "MySQL", "PostgreSQL", "MongoDB", "Redis", "Cassandra", "Oracle", "SQL Server",
            "SQLite", "Neo4j", "Elasticsearch", "DynamoDB", "MariaDB", "CouchDB", "InfluxDB",
            "SQL",
        ] {
            skills.push(Skill::new(name));
        }

        // Cloud platforms
        skills.push(Skill::with_variants("Google Cloud", &["gcp"]));
        for name in [
            "AWS", "Azure", "IBM Cloud", "Oracle Cloud", "DigitalOcean", "Heroku", "Vercel",
            "Netlify", "Firebase",
        ] {
            skills.push(Skill::new(name));
        }

        // DevOps tooling
        for name in [
            "Docker", "Kubernetes", "Jenkins", "GitLab CI", "GitHub Actions", "Terraform",
            "Ansible", "Chef", "Puppet", "Prometheus", "Grafana", "Splunk", "Datadog",
            "New Relic", "Git",
        ] {
            skills.push(Skill::new(name));
        }

        // AI / ML
        for name in [
            "TensorFlow", "PyTorch", "Scikit-learn", "Keras", "OpenCV", "NLTK", "spaCy",
            "Hugging Face", "Pandas", "NumPy", "Matplotlib", "Seaborn", "Plotly", "Jupyter",
            "MLflow", "Machine Learning", "Deep Learning", "Computer Vision", "NLP",
            "LangChain", "Prompt Engineering",
        ] {
            skills.push(Skill::new(name));
        }

        // Soft skills
        for name in [
            "Leadership", "Communication", "Problem Solving", "Teamwork", "Time Management",
            "Adaptability", "Creativity", "Critical Thinking", "Project Management", "Agile",
            "Scrum", "Kanban",
        ] {
            skills.push(Skill::new(name));
        }

        Self::new(skills)
    }
}
