use crate::api::{Group, TeacherApi};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_groups: usize,
    pub total_students: i64,
    pub pending: i64,
}

impl DashboardStats {
    pub fn from_groups(groups: &[Group]) -> Self {
        Self {
            total_groups: groups.len(),
            total_students: groups.iter().map(|g| g.students_count.max(0)).sum(),
            pending: groups.iter().map(|g| g.pending_count.max(0)).sum(),
        }
    }
}

pub struct DashboardView {
    api: TeacherApi,
    pub groups: Vec<Group>,
    pub loading: bool,
    pub err: Option<String>,
}

impl DashboardView {
    pub fn new(api: TeacherApi) -> Self {
        Self {
            api,
            groups: Vec::new(),
            loading: true,
            err: None,
        }
    }

    pub async fn load(&mut self) {
        self.err = None;
        self.loading = true;
        match self.api.groups(None).await {
            Ok(groups) => self.groups = groups,
            Err(e) => self.err = Some(e.to_string()),
        }
        self.loading = false;
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_groups(&self.groups)
    }
}
