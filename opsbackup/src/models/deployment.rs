//! Deployment role classification

use opsman_models::{InstallationSettings, JobInstance};
use serde::{Deserialize, Serialize};

/// Role a job plays in an Elastic Runtime deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    CloudController,
    CloudControllerDatabase,
    DiegoBrain,
    DiegoCell,
    DiegoDatabase,
    Router,
    Uaa,
    UaaDatabase,
}

/// Keyword groups that put a job into a role. A group matches when every
/// keyword in it occurs somewhere in the job name; the rule matches when
/// any of its groups does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub role: Role,
    pub groups: Vec<Vec<String>>,
}

impl RoleRule {
    /// Rule with one single-keyword group per entry of `keywords`
    pub fn new(role: Role, keywords: &[&str]) -> Self {
        Self {
            role,
            groups: keywords.iter().map(|k| vec![k.to_string()]).collect(),
        }
    }

    /// Add a group whose keywords must all occur in the name
    pub fn all_of(mut self, keywords: &[&str]) -> Self {
        self.groups
            .push(keywords.iter().map(|k| k.to_string()).collect());
        self
    }

    fn matches(&self, name: &str) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|k| name.contains(k.as_str())))
    }
}

/// Every name matching `long` also matches `short`
fn covers(short: &[String], long: &[String]) -> bool {
    short
        .iter()
        .all(|s| long.iter().any(|l| l.contains(s.as_str())))
}

/// Ordered rule table; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRules(pub Vec<RoleRule>);

impl Default for RoleRules {
    fn default() -> Self {
        Self(vec![
            RoleRule::new(Role::CloudControllerDatabase, &["ccdb"])
                .all_of(&["cloud_controller", "database"]),
            RoleRule::new(Role::UaaDatabase, &["uaadb"]).all_of(&["uaa", "database"]),
            RoleRule::new(Role::DiegoDatabase, &["diego_database"]),
            RoleRule::new(Role::DiegoBrain, &["diego_brain"]),
            RoleRule::new(Role::DiegoCell, &["diego_cell"]),
            RoleRule::new(Role::CloudController, &["cloud_controller"]),
            RoleRule::new(Role::Uaa, &["uaa"]),
            RoleRule::new(Role::Router, &["router"]),
        ])
    }
}

impl RoleRules {
    /// Reject tables where a group would take every name of a group of a
    /// later rule, e.g. `cloud_controller` listed before
    /// `cloud_controller` + `database`.
    pub fn validate(&self) -> Result<(), String> {
        for (i, earlier) in self.0.iter().enumerate() {
            for later in &self.0[i + 1..] {
                if earlier.role == later.role {
                    continue;
                }
                for short in &earlier.groups {
                    if let Some(long) = later.groups.iter().find(|long| covers(short, long)) {
                        return Err(format!(
                            "keywords '{}' ({:?}) shadow '{}' ({:?})",
                            short.join("+"),
                            earlier.role,
                            long.join("+"),
                            later.role
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Role of a job name, if any rule matches
    pub fn role_of(&self, name: &str) -> Option<Role> {
        self.0.iter().find(|rule| rule.matches(name)).map(|rule| rule.role)
    }

    /// Role of a job: its names are tried in order and the first one any
    /// rule matches decides
    pub fn role_of_job(&self, job: &JobInstance) -> Option<Role> {
        job.names().find_map(|name| self.role_of(name))
    }
}

/// Jobs of one product grouped by role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// GUID of the product the jobs were taken from
    pub release: String,
    pub cloud_controller_jobs: Vec<JobInstance>,
    pub cloud_controller_database_jobs: Vec<JobInstance>,
    pub diego_brain_jobs: Vec<JobInstance>,
    pub diego_cell_jobs: Vec<JobInstance>,
    pub diego_database_jobs: Vec<JobInstance>,
    pub router_jobs: Vec<JobInstance>,
    pub uaa_jobs: Vec<JobInstance>,
    pub uaa_database_jobs: Vec<JobInstance>,
}

impl Deployment {
    /// Classify the jobs of `release` with the default rule table
    pub fn new(settings: &InstallationSettings, release: &str) -> Self {
        Classifier::default().classify(settings, release)
    }

    /// Jobs in a role bucket
    pub fn jobs(&self, role: Role) -> &[JobInstance] {
        match role {
            Role::CloudController => &self.cloud_controller_jobs,
            Role::CloudControllerDatabase => &self.cloud_controller_database_jobs,
            Role::DiegoBrain => &self.diego_brain_jobs,
            Role::DiegoCell => &self.diego_cell_jobs,
            Role::DiegoDatabase => &self.diego_database_jobs,
            Role::Router => &self.router_jobs,
            Role::Uaa => &self.uaa_jobs,
            Role::UaaDatabase => &self.uaa_database_jobs,
        }
    }

    fn bucket_mut(&mut self, role: Role) -> &mut Vec<JobInstance> {
        match role {
            Role::CloudController => &mut self.cloud_controller_jobs,
            Role::CloudControllerDatabase => &mut self.cloud_controller_database_jobs,
            Role::DiegoBrain => &mut self.diego_brain_jobs,
            Role::DiegoCell => &mut self.diego_cell_jobs,
            Role::DiegoDatabase => &mut self.diego_database_jobs,
            Role::Router => &mut self.router_jobs,
            Role::Uaa => &mut self.uaa_jobs,
            Role::UaaDatabase => &mut self.uaa_database_jobs,
        }
    }

    /// Total number of classified jobs
    pub fn job_count(&self) -> usize {
        [
            Role::CloudController,
            Role::CloudControllerDatabase,
            Role::DiegoBrain,
            Role::DiegoCell,
            Role::DiegoDatabase,
            Role::Router,
            Role::Uaa,
            Role::UaaDatabase,
        ]
        .into_iter()
        .map(|role| self.jobs(role).len())
        .sum()
    }
}

/// Builds a `Deployment` from installation settings
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: RoleRules,
}

impl Classifier {
    pub fn with_rules(rules: RoleRules) -> Result<Self, String> {
        rules.validate()?;
        Ok(Self { rules })
    }

    /// Group the jobs of the product whose GUID is `release`. An unknown
    /// release gives an empty deployment; jobs matching no rule are left out.
    pub fn classify(&self, settings: &InstallationSettings, release: &str) -> Deployment {
        let mut deployment = Deployment {
            release: release.to_string(),
            ..Default::default()
        };

        let Some(product) = settings.product_by_guid(release) else {
            return deployment;
        };

        for job in &product.jobs {
            if let Some(role) = self.rules.role_of_job(job) {
                deployment.bucket_mut(role).push(job.clone());
            }
        }

        deployment
    }
}
