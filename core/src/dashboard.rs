use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AgentRecord, GenerationJobRecord, JobStatus};

/// Aggregate view over a tenant's generation jobs and agents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Total number of generation jobs
    pub total_jobs: u64,
    /// Number of jobs by status
    pub jobs_by_status: HashMap<JobStatus, u64>,
    /// Agents produced by completed jobs
    pub agents_generated: u64,
    /// Most recently created job timestamp
    pub latest_created: Option<DateTime<Utc>>,
    /// Most recently completed job timestamp
    pub latest_completed: Option<DateTime<Utc>>,
    /// Agents known to the tenant
    pub total_agents: u64,
    /// Agents currently serving their channels
    pub active_agents: u64,
    /// Number of agents by review status
    pub agents_by_status: BTreeMap<String, u64>,
}

impl DashboardStats {
    pub fn from_jobs(jobs: &[GenerationJobRecord]) -> Self {
        let mut stats = DashboardStats {
            total_jobs: jobs.len() as u64,
            ..Default::default()
        };

        for job in jobs {
            *stats.jobs_by_status.entry(job.status).or_insert(0) += 1;
            if job.status == JobStatus::Completed {
                stats.agents_generated += u64::from(job.produced_agents());
            }
        }

        stats.latest_created = jobs.iter().map(|j| j.created_at).max();
        stats.latest_completed = jobs.iter().filter_map(|j| j.completed_at).max();

        stats
    }

    /// Add the agent counters; job counters are left as they are
    pub fn with_agents(mut self, agents: &[AgentRecord]) -> Self {
        self.total_agents = agents.len() as u64;
        self.active_agents = agents.iter().filter(|a| a.is_active).count() as u64;
        self.agents_by_status.clear();
        for agent in agents {
            *self
                .agents_by_status
                .entry(agent.status_label().to_string())
                .or_insert(0) += 1;
        }
        self
    }

    pub fn inactive_agents(&self) -> u64 {
        self.total_agents - self.active_agents
    }

    pub fn agents_in_status(&self, status: &str) -> u64 {
        self.agents_by_status.get(status).copied().unwrap_or(0)
    }

    pub fn count(&self, status: JobStatus) -> u64 {
        self.jobs_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Jobs that have not reached a terminal status
    pub fn active_jobs(&self) -> u64 {
        self.count(JobStatus::Pending) + self.count(JobStatus::InProgress)
    }
}

/// Jobs sorted most recent first, the order the dashboard lists them in
pub fn sort_recent_first(jobs: &mut [GenerationJobRecord]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(id: &str, status: JobStatus, minutes_ago: i64) -> GenerationJobRecord {
        let created_at = Utc::now() - Duration::minutes(minutes_ago);
        GenerationJobRecord {
            job_id: id.into(),
            status,
            progress: Some(if status == JobStatus::Completed { 100 } else { 10 }),
            agent_count: None,
            generated_agents: if status == JobStatus::Completed {
                vec!["a".to_string(), "b".to_string()]
            } else {
                vec![]
            },
            created_at,
            completed_at: (status == JobStatus::Completed).then(|| created_at + Duration::minutes(1)),
            error: (status == JobStatus::Failed).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn test_dashboard_stats_default() {
        let stats = DashboardStats::from_jobs(&[]);
        assert_eq!(stats, DashboardStats::default());
        assert_eq!(stats.active_jobs(), 0);
    }

    #[test]
    fn test_dashboard_stats_counts() {
        let jobs = vec![
            job("1", JobStatus::Completed, 30),
            job("2", JobStatus::Completed, 20),
            job("3", JobStatus::Failed, 10),
            job("4", JobStatus::InProgress, 5),
            job("5", JobStatus::Pending, 1),
        ];
        let stats = DashboardStats::from_jobs(&jobs);

        assert_eq!(stats.total_jobs, 5);
        assert_eq!(stats.count(JobStatus::Completed), 2);
        assert_eq!(stats.count(JobStatus::Failed), 1);
        assert_eq!(stats.active_jobs(), 2);
        assert_eq!(stats.agents_generated, 4);
        assert_eq!(stats.latest_created, Some(jobs[4].created_at));
        assert_eq!(stats.latest_completed, jobs[1].completed_at);
    }

    fn agent(id: &str, status: &str, is_active: bool) -> AgentRecord {
        AgentRecord {
            id: id.to_string(),
            name: id.to_string(),
            agent_type: "sales".to_string(),
            status: status.to_string(),
            is_active,
            description: None,
            configuration: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_agent_counts() {
        let agents = vec![
            agent("1", "approved", true),
            agent("2", "approved", false),
            agent("3", "pending_review", false),
            agent("4", "", true),
        ];
        let stats = DashboardStats::from_jobs(&[job("j", JobStatus::Completed, 5)]).with_agents(&agents);

        assert_eq!(stats.total_jobs, 1);
        assert_eq!(stats.total_agents, 4);
        assert_eq!(stats.active_agents, 2);
        assert_eq!(stats.inactive_agents(), 2);
        assert_eq!(stats.agents_in_status("approved"), 2);
        assert_eq!(stats.agents_in_status("pending_review"), 1);
        assert_eq!(stats.agents_in_status("unknown"), 1);
        assert_eq!(stats.agents_in_status("rejected"), 0);

        let cleared = stats.with_agents(&[]);
        assert_eq!(cleared.total_agents, 0);
        assert!(cleared.agents_by_status.is_empty());
    }

    #[test]
    fn test_sort_recent_first() {
        let mut jobs = vec![
            job("old", JobStatus::Completed, 60),
            job("new", JobStatus::Pending, 1),
        ];
        sort_recent_first(&mut jobs);
        assert_eq!(jobs[0].job_id.as_str(), "new");
    }
}
