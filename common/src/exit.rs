//! Process exit statuses and their user-facing messages

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Norm,
    Internal,
    Usage,
    ManifestRead,
    ManifestWrite,
    UtilNotFound,
    NotFound,
    LogError,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Norm => 0,
            ExitStatus::Internal => 1,
            ExitStatus::Usage => 3,
            ExitStatus::ManifestRead => 4,
            ExitStatus::ManifestWrite => 5,
            ExitStatus::UtilNotFound => 6,
            ExitStatus::NotFound => 7,
            ExitStatus::LogError => 8,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ExitStatus::Norm => "",
            ExitStatus::Internal => "Unknown error",
            ExitStatus::Usage => "Usage:",
            ExitStatus::ManifestRead => "Unable to read manifest",
            ExitStatus::ManifestWrite => "Unable to write manifest",
            ExitStatus::UtilNotFound => "Copying utility not found",
            ExitStatus::NotFound => "File not found",
            ExitStatus::LogError => "Unable to open logs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let all = [
            ExitStatus::Norm,
            ExitStatus::Internal,
            ExitStatus::Usage,
            ExitStatus::ManifestRead,
            ExitStatus::ManifestWrite,
            ExitStatus::UtilNotFound,
            ExitStatus::NotFound,
            ExitStatus::LogError,
        ];
        let codes: std::collections::HashSet<i32> = all.iter().map(|s| s.code()).collect();
        assert_eq!(codes.len(), all.len());
        assert_eq!(ExitStatus::Norm.code(), 0);
    }
}
