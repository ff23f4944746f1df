//! JoinRecord / QuitRecord <-> model mappers

use guard_core::entities::{JoinRecord, QuitRecord, QuitType};
use guard_core::error::DomainError;
use guard_core::value_objects::{GroupId, UserId};

use crate::models::{JoinRecordModel, QuitRecordModel};

impl From<JoinRecordModel> for JoinRecord {
    fn from(model: JoinRecordModel) -> Self {
        JoinRecord {
            user_id: UserId::new(model.user_id),
            group_id: GroupId::new(model.group_id),
            join_time: model.join_time,
        }
    }
}

impl TryFrom<QuitRecordModel> for QuitRecord {
    type Error = DomainError;

    fn try_from(model: QuitRecordModel) -> Result<Self, Self::Error> {
        let quit_type = QuitType::parse(&model.quit_type)
            .ok_or_else(|| DomainError::UnknownQuitType(model.quit_type.clone()))?;

        Ok(QuitRecord {
            user_id: UserId::new(model.user_id),
            group_id: GroupId::new(model.group_id),
            quit_time: model.quit_time,
            quit_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_quit_model_maps_known_type() {
        let model = QuitRecordModel {
            user_id: 10,
            group_id: 20,
            quit_time: Utc::now(),
            quit_type: "kick".into(),
        };
        let record = QuitRecord::try_from(model).unwrap();
        assert_eq!(record.quit_type, QuitType::Kick);
        assert_eq!(record.group_id, GroupId::new(20));
    }

    #[test]
    fn test_quit_model_rejects_unknown_type() {
        let model = QuitRecordModel {
            user_id: 10,
            group_id: 20,
            quit_time: Utc::now(),
            quit_type: "ban".into(),
        };
        let err = QuitRecord::try_from(model).unwrap_err();
        assert!(matches!(err, DomainError::UnknownQuitType(t) if t == "ban"));
    }
}
