//! Role/level skill catalog.
//!
//! The catalog maps `(target role, level)` to an ordered list of skills. A
//! built-in catalog ships with the crate; deployments can replace it with a
//! JSON file of the same shape:
//!
//! ```json
//! { "Data Scientist": { "beginner": [ { "skill": "Python Basics",
//!   "resources": ["..."], "duration": "2 weeks" } ] } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use upnext_core::{Error, Result};

/// One skill of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Skill name, becomes the task title
    pub skill: String,
    /// Learning resources
    #[serde(default)]
    pub resources: Vec<String>,
    /// Human readable duration ("2 weeks")
    pub duration: String,
}

/// A `(role, level)` lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogKey {
    /// Target role
    pub role: String,
    /// Level
    pub level: String,
}

impl CatalogKey {
    /// Build a key.
    pub fn new(role: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            level: level.into(),
        }
    }
}

/// Skill catalog keyed by role, then level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    roles: BTreeMap<String, BTreeMap<String, Vec<CatalogItem>>>,
}

impl Catalog {
    /// Parse a catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("invalid catalog: {e}")))?;
        Ok(catalog.normalized())
    }

    /// Load a catalog file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Storage(format!("read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Levels are matched case-insensitively.
    fn normalized(mut self) -> Self {
        for levels in self.roles.values_mut() {
            *levels = std::mem::take(levels)
                .into_iter()
                .map(|(level, items)| (level.to_lowercase(), items))
                .collect();
        }
        self
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, key: CatalogKey, items: Vec<CatalogItem>) {
        self.roles
            .entry(key.role)
            .or_default()
            .insert(key.level.to_lowercase(), items);
    }

    /// Known target roles.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Skills for `(role, level)`.
    pub fn lookup(&self, role: &str, level: &str) -> Result<&[CatalogItem]> {
        self.roles
            .get(role)
            .and_then(|levels| levels.get(&level.to_lowercase()))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::CatalogNotFound {
                role: role.to_string(),
                level: level.to_string(),
            })
    }

    /// Look up `key`, falling back to `fallback` when the key has no entry.
    ///
    /// Returns the key that was actually used.
    pub fn resolve<'a>(
        &'a self,
        key: &'a CatalogKey,
        fallback: Option<&'a CatalogKey>,
    ) -> Result<(&'a CatalogKey, &'a [CatalogItem])> {
        match self.lookup(&key.role, &key.level) {
            Ok(items) => Ok((key, items)),
            Err(err) => match fallback {
                Some(fb) => self.lookup(&fb.role, &fb.level).map(|items| (fb, items)),
                None => Err(err),
            },
        }
    }

    /// Catalog shipped with UpNext.
    pub fn builtin() -> Self {
        let mut catalog = Catalog::default();
        for (role, level, items) in BUILTIN {
            let items = items
                .iter()
                .map(|(skill, resources, duration)| CatalogItem {
                    skill: skill.to_string(),
                    resources: resources.iter().map(|r| r.to_string()).collect(),
                    duration: duration.to_string(),
                })
                .collect();
            catalog.insert(CatalogKey::new(*role, *level), items);
        }
        catalog
    }
}

/// Category of a skill, derived from keywords in its name.
///
/// Rules are checked in order; the first keyword found wins.
pub fn category_for(skill: &str) -> &'static str {
    CATEGORY_RULES
        .iter()
        .find(|(keyword, _)| skill.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or("General")
}

const CATEGORY_RULES: &[(&str, &str)] = &[
    ("Python", "Programming"),
    ("JavaScript", "Programming"),
    ("HTML", "Frontend"),
    ("CSS", "Frontend"),
    ("React", "Frontend"),
    ("Node", "Backend"),
    ("Express", "Backend"),
    ("Database", "Backend"),
    ("SQL", "Backend"),
    ("MongoDB", "Backend"),
    ("Machine Learning", "AI/ML"),
    ("Deep Learning", "AI/ML"),
    ("Data", "Data Science"),
    ("Statistics", "Data Science"),
    ("Git", "Tools"),
    ("Docker", "DevOps"),
    ("Testing", "Quality"),
    ("API", "Backend"),
    ("System Design", "Architecture"),
];

type BuiltinItem = (&'static str, &'static [&'static str], &'static str);

const BUILTIN: &[(&str, &str, &[BuiltinItem])] = &[
    (
        "Data Scientist",
        "beginner",
        &[
            ("Python Basics", &["Python for Everybody (Coursera)", "Automate the Boring Stuff"], "2 weeks"),
            ("Statistics & Probability", &["Khan Academy Statistics", "StatQuest YouTube"], "2 weeks"),
            ("Pandas & NumPy", &["Kaggle Learn", "DataCamp Pandas"], "1 week"),
            ("Data Visualization", &["Matplotlib Tutorial", "Seaborn Guide"], "1 week"),
            ("SQL Basics", &["SQLBolt", "Mode SQL Tutorial"], "1 week"),
            ("Basic Machine Learning", &["Andrew Ng ML Course", "Scikit-learn Docs"], "3 weeks"),
        ],
    ),
    (
        "Data Scientist",
        "intermediate",
        &[
            ("Advanced Python", &["Real Python", "Python Design Patterns"], "2 weeks"),
            ("Machine Learning Algorithms", &["Hands-On ML Book", "Fast.ai"], "3 weeks"),
            ("Deep Learning Basics", &["Deep Learning Specialization", "PyTorch Tutorials"], "3 weeks"),
            ("Feature Engineering", &["Kaggle Feature Engineering", "Applied ML"], "2 weeks"),
            ("Model Deployment", &["Flask API Tutorial", "Docker Basics"], "2 weeks"),
        ],
    ),
    (
        "Data Scientist",
        "advanced",
        &[
            ("Advanced Deep Learning", &["Fast.ai Part 2", "Papers with Code"], "4 weeks"),
            ("MLOps", &["MLflow", "Kubeflow"], "3 weeks"),
            ("Big Data Tools", &["Spark Tutorial", "Hadoop Basics"], "3 weeks"),
            ("Research Papers", &["arXiv", "Distill.pub"], "Ongoing"),
        ],
    ),
    (
        "Full Stack Developer",
        "beginner",
        &[
            ("HTML & CSS", &["freeCodeCamp", "MDN Web Docs"], "2 weeks"),
            ("JavaScript Basics", &["JavaScript.info", "Eloquent JavaScript"], "3 weeks"),
            ("Git & GitHub", &["Git Handbook", "GitHub Learning Lab"], "1 week"),
            ("React Basics", &["React Docs", "React Tutorial"], "2 weeks"),
            ("Node.js & Express", &["Node.js Docs", "Express Tutorial"], "2 weeks"),
            ("Database Basics", &["MongoDB University", "PostgreSQL Tutorial"], "2 weeks"),
        ],
    ),
    (
        "Full Stack Developer",
        "intermediate",
        &[
            ("Advanced React", &["React Patterns", "State Management"], "2 weeks"),
            ("RESTful APIs", &["REST API Design", "API Best Practices"], "2 weeks"),
            ("Authentication", &["JWT Tutorial", "OAuth Guide"], "1 week"),
            ("Testing", &["Jest Docs", "Testing Library"], "2 weeks"),
            ("Deployment", &["Vercel", "Heroku", "AWS Basics"], "2 weeks"),
        ],
    ),
    (
        "Full Stack Developer",
        "advanced",
        &[
            ("Microservices", &["Microservices Pattern", "Docker & Kubernetes"], "4 weeks"),
            ("System Design", &["System Design Primer", "Designing Data-Intensive Apps"], "4 weeks"),
            ("Performance Optimization", &["Web Performance", "Chrome DevTools"], "2 weeks"),
            ("CI/CD", &["GitHub Actions", "Jenkins"], "2 weeks"),
        ],
    ),
    (
        "Software Engineer",
        "beginner",
        &[
            ("Programming Fundamentals", &["CS50", "Programming Basics"], "3 weeks"),
            ("Data Structures", &["Algorithms Course", "LeetCode Easy"], "3 weeks"),
            ("Object-Oriented Programming", &["OOP Principles", "Design Basics"], "2 weeks"),
            ("Version Control", &["Git Tutorial", "GitHub Workflow"], "1 week"),
            ("Basic Web Development", &["Web Dev Basics", "HTTP Protocol"], "2 weeks"),
        ],
    ),
    (
        "Software Engineer",
        "intermediate",
        &[
            ("Algorithms", &["CLRS Book", "LeetCode Medium"], "4 weeks"),
            ("System Design Basics", &["Scalability", "Database Design"], "3 weeks"),
            ("Testing & Debugging", &["Unit Testing", "Debugging Techniques"], "2 weeks"),
            ("APIs & Microservices", &["API Design", "Microservices"], "3 weeks"),
            ("Cloud Platforms", &["AWS/GCP/Azure Basics"], "2 weeks"),
        ],
    ),
    (
        "Software Engineer",
        "advanced",
        &[
            ("Advanced Algorithms", &["Competitive Programming", "LeetCode Hard"], "4 weeks"),
            ("Distributed Systems", &["MIT 6.824", "Distributed Computing"], "6 weeks"),
            ("Security", &["OWASP", "Security Best Practices"], "3 weeks"),
            ("Performance Engineering", &["Profiling", "Optimization"], "3 weeks"),
        ],
    ),
];
