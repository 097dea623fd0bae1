//! 成员填写上下文
//!
//! 封装"我正在填第几位、一共几位"这一信息

use std::fmt::Display;

/// 成员角色：第 1 位是领队，其余是普通成员
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrantRole {
    Leader,
    Member,
}

/// 成员填写上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrantCtx {
    /// 序号（从 1 开始，1 是领队）
    pub index: usize,

    /// 本次要填写的总人数（已按团队上限截断）
    pub total: usize,
}

impl EntrantCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    pub fn role(&self) -> EntrantRole {
        if self.index <= 1 {
            EntrantRole::Leader
        } else {
            EntrantRole::Member
        }
    }

    pub fn is_leader(&self) -> bool {
        self.role() == EntrantRole::Leader
    }

    pub fn is_last(&self) -> bool {
        self.index >= self.total
    }
}

impl Display for EntrantCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.role() {
            EntrantRole::Leader => "领队",
            EntrantRole::Member => "成员",
        };
        write!(f, "[{} {}/{}]", label, self.index, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_role() {
        let leader = EntrantCtx::new(1, 8);
        assert_eq!(leader.to_string(), "[领队 1/8]");
        assert!(leader.is_leader());

        let member = EntrantCtx::new(3, 8);
        assert_eq!(member.to_string(), "[成员 3/8]");
        assert_eq!(member.role(), EntrantRole::Member);
        assert!(!member.is_last());
        assert!(EntrantCtx::new(8, 8).is_last());
    }
}
