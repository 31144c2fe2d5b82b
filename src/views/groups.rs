use crate::api::{Group, TeacherApi};

pub struct GroupsView {
    api: TeacherApi,
    pub groups: Vec<Group>,
    pub loading: bool,
    pub creating: bool,
    pub err: Option<String>,
}

impl GroupsView {
    pub fn new(api: TeacherApi) -> Self {
        Self {
            api,
            groups: Vec::new(),
            loading: true,
            creating: false,
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

    /// Groups whose name or join code contains `query`, case-insensitively.
    pub fn filtered(&self, query: &str) -> Vec<&Group> {
        filter_groups(&self.groups, query)
    }

    /// Create a group and reload the list. Returns whether it was created.
    pub async fn create(&mut self, name: &str) -> bool {
        if self.creating {
            return false;
        }
        self.err = None;

        let name = name.trim();
        if name.is_empty() {
            self.err = Some("Enter a group name.".to_string());
            return false;
        }

        self.creating = true;
        let created = match self.api.create_group(name).await {
            Ok(_) => {
                self.load().await;
                true
            }
            Err(e) => {
                self.err = Some(e.to_string());
                false
            }
        };
        self.creating = false;
        created
    }
}

pub fn filter_groups<'a>(groups: &'a [Group], query: &str) -> Vec<&'a Group> {
    let needle = query.trim().to_lowercase();
    groups
        .iter()
        .filter(|g| {
            needle.is_empty()
                || g.name.to_lowercase().contains(&needle)
                || g.code.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, code: &str) -> Group {
        Group {
            id: 1,
            name: name.to_string(),
            code: code.to_string(),
            students_count: 0,
            pending_count: 0,
        }
    }

    #[test]
    fn filter_matches_name_or_code() {
        let groups = vec![group("Math 9-A", "QX12"), group("Physics", "MATH77"), group("Art", "ZZ")];
        let hits: Vec<_> = filter_groups(&groups, " math ").iter().map(|g| g.name.as_str()).collect();
        assert_eq!(hits, vec!["Math 9-A", "Physics"]);
    }

    #[test]
    fn blank_query_keeps_everything() {
        let groups = vec![group("A", "1"), group("B", "2")];
        assert_eq!(filter_groups(&groups, "   ").len(), 2);
    }
}
