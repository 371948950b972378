//! Application-state container for the persisted collections.
//!
//! Every mutation goes through a named command on [`AppData`]. A command
//! builds the changed collection, writes it to the [`KvStore`], and only then
//! replaces the in-memory copy, so a failed write leaves state untouched.

use crate::model::{ClassGroup, Homework, Notice, NoticeType, Student};
use crate::store::{self, KvStore};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("class not found")]
    ClassNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("notice not found")]
    NoticeNotFound,
    #[error("homework not found")]
    HomeworkNotFound,
    #[error("failed to persist {key}: {message}")]
    Persist { key: &'static str, message: String },
}

impl RosterError {
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::Empty(_) => "bad_params",
            RosterError::ClassNotFound
            | RosterError::StudentNotFound
            | RosterError::NoticeNotFound
            | RosterError::HomeworkNotFound => "not_found",
            RosterError::Persist { .. } => "store_write_failed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentInput {
    pub roll_no: Option<String>,
    pub name: String,
    pub father_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub roll_no: Option<String>,
    pub name: Option<String>,
    pub father_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NoticeInput {
    pub title: String,
    pub description: String,
    pub kind: NoticeType,
    pub date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct HomeworkInput {
    pub class_id: String,
    pub subject: String,
    pub description: String,
    pub assigned_date: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Default)]
pub struct AppData {
    pub teacher_name: Option<String>,
    pub classes: Vec<ClassGroup>,
    pub notices: Vec<Notice>,
    pub homework: Vec<Homework>,
}

fn persist_err(key: &'static str, e: anyhow::Error) -> RosterError {
    let message = format!("{e:#}");
    tracing::warn!(key, error = %message, "store write failed");
    RosterError::Persist { key, message }
}

fn required(value: &str, field: &'static str) -> Result<String, RosterError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(RosterError::Empty(field));
    }
    Ok(t.to_string())
}

impl AppData {
    pub fn load(store: &dyn KvStore) -> Self {
        let teacher_name: Option<String> =
            store::load_or_default(store, store::KEY_TEACHER_NAME);
        Self {
            teacher_name: teacher_name.filter(|n| !n.trim().is_empty()),
            classes: store::load_or_default(store, store::KEY_CLASSES),
            notices: store::load_or_default(store, store::KEY_NOTICES),
            homework: store::load_or_default(store, store::KEY_HOMEWORK),
        }
    }

    pub fn class(&self, class_id: &str) -> Result<&ClassGroup, RosterError> {
        self.classes
            .iter()
            .find(|c| c.id == class_id)
            .ok_or(RosterError::ClassNotFound)
    }

    fn commit_classes(
        &mut self,
        store: &mut dyn KvStore,
        next: Vec<ClassGroup>,
    ) -> Result<(), RosterError> {
        store::save_json(store, store::KEY_CLASSES, &next)
            .map_err(|e| persist_err(store::KEY_CLASSES, e))?;
        self.classes = next;
        Ok(())
    }

    fn commit_notices(
        &mut self,
        store: &mut dyn KvStore,
        next: Vec<Notice>,
    ) -> Result<(), RosterError> {
        store::save_json(store, store::KEY_NOTICES, &next)
            .map_err(|e| persist_err(store::KEY_NOTICES, e))?;
        self.notices = next;
        Ok(())
    }

    fn commit_homework(
        &mut self,
        store: &mut dyn KvStore,
        next: Vec<Homework>,
    ) -> Result<(), RosterError> {
        store::save_json(store, store::KEY_HOMEWORK, &next)
            .map_err(|e| persist_err(store::KEY_HOMEWORK, e))?;
        self.homework = next;
        Ok(())
    }

    pub fn login(&mut self, store: &mut dyn KvStore, name: &str) -> Result<(), RosterError> {
        let name = required(name, "name")?;
        store::save_json(store, store::KEY_TEACHER_NAME, &name)
            .map_err(|e| persist_err(store::KEY_TEACHER_NAME, e))?;
        tracing::debug!(%name, "teacher logged in");
        self.teacher_name = Some(name);
        Ok(())
    }

    pub fn logout(&mut self, store: &mut dyn KvStore) -> Result<(), RosterError> {
        store
            .remove(store::KEY_TEACHER_NAME)
            .map_err(|e| persist_err(store::KEY_TEACHER_NAME, e))?;
        self.teacher_name = None;
        Ok(())
    }

    pub fn create_class(
        &mut self,
        store: &mut dyn KvStore,
        name: &str,
        students: Vec<StudentInput>,
    ) -> Result<&ClassGroup, RosterError> {
        let name = required(name, "name")?;
        let mut class = ClassGroup {
            id: Uuid::new_v4().to_string(),
            name,
            students: Vec::with_capacity(students.len()),
        };
        for input in students {
            let student = build_student(&class, input)?;
            class.students.push(student);
        }
        tracing::debug!(class_id = %class.id, students = class.students.len(), "class created");
        let mut next = self.classes.clone();
        next.push(class);
        self.commit_classes(store, next)?;
        self.classes.last().ok_or(RosterError::ClassNotFound)
    }

    pub fn rename_class(
        &mut self,
        store: &mut dyn KvStore,
        class_id: &str,
        name: &str,
    ) -> Result<(), RosterError> {
        let name = required(name, "name")?;
        let mut next = self.classes.clone();
        find_class(&mut next, class_id)?.name = name;
        self.commit_classes(store, next)
    }

    /// Deleting a class drops its students and any homework assigned to it.
    pub fn delete_class(
        &mut self,
        store: &mut dyn KvStore,
        class_id: &str,
    ) -> Result<(), RosterError> {
        let mut next = self.classes.clone();
        next.retain(|c| c.id != class_id);
        if next.len() == self.classes.len() {
            return Err(RosterError::ClassNotFound);
        }
        self.commit_classes(store, next)?;

        if self.homework.iter().any(|h| h.class_id == class_id) {
            let mut hw = self.homework.clone();
            hw.retain(|h| h.class_id != class_id);
            self.commit_homework(store, hw)?;
        }
        Ok(())
    }

    pub fn add_student(
        &mut self,
        store: &mut dyn KvStore,
        class_id: &str,
        input: StudentInput,
    ) -> Result<Student, RosterError> {
        let mut next = self.classes.clone();
        let class = find_class(&mut next, class_id)?;
        let student = build_student(class, input)?;
        class.students.push(student.clone());
        self.commit_classes(store, next)?;
        Ok(student)
    }

    pub fn update_student(
        &mut self,
        store: &mut dyn KvStore,
        class_id: &str,
        student_id: &str,
        patch: StudentPatch,
    ) -> Result<Student, RosterError> {
        let mut next = self.classes.clone();
        let student = find_class(&mut next, class_id)?
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
            .ok_or(RosterError::StudentNotFound)?;
        if let Some(roll) = patch.roll_no {
            student.roll_no = required(&roll, "rollNo")?;
        }
        if let Some(name) = patch.name {
            student.name = required(&name, "name")?;
        }
        if let Some(father) = patch.father_name {
            student.father_name = father.trim().to_string();
        }
        let updated = student.clone();
        self.commit_classes(store, next)?;
        Ok(updated)
    }

    pub fn remove_student(
        &mut self,
        store: &mut dyn KvStore,
        class_id: &str,
        student_id: &str,
    ) -> Result<(), RosterError> {
        let mut next = self.classes.clone();
        let class = find_class(&mut next, class_id)?;
        let before = class.students.len();
        class.students.retain(|s| s.id != student_id);
        if class.students.len() == before {
            return Err(RosterError::StudentNotFound);
        }
        self.commit_classes(store, next)
    }

    pub fn add_notice(
        &mut self,
        store: &mut dyn KvStore,
        input: NoticeInput,
    ) -> Result<Notice, RosterError> {
        let notice = Notice {
            id: Uuid::new_v4().to_string(),
            title: required(&input.title, "title")?,
            description: input.description.trim().to_string(),
            kind: input.kind,
            date: input.date,
            expiry_date: input.expiry_date,
            created_at: Utc::now(),
        };
        let mut next = self.notices.clone();
        next.push(notice.clone());
        self.commit_notices(store, next)?;
        Ok(notice)
    }

    pub fn delete_notice(
        &mut self,
        store: &mut dyn KvStore,
        notice_id: &str,
    ) -> Result<(), RosterError> {
        let mut next = self.notices.clone();
        next.retain(|n| n.id != notice_id);
        if next.len() == self.notices.len() {
            return Err(RosterError::NoticeNotFound);
        }
        self.commit_notices(store, next)
    }

    pub fn add_homework(
        &mut self,
        store: &mut dyn KvStore,
        input: HomeworkInput,
    ) -> Result<Homework, RosterError> {
        self.class(&input.class_id)?;
        let hw = Homework {
            id: Uuid::new_v4().to_string(),
            class_id: input.class_id,
            subject: required(&input.subject, "subject")?,
            description: required(&input.description, "description")?,
            assigned_date: input.assigned_date,
            due_date: input.due_date,
            created_at: Utc::now(),
        };
        let mut next = self.homework.clone();
        next.push(hw.clone());
        self.commit_homework(store, next)?;
        Ok(hw)
    }

    pub fn delete_homework(
        &mut self,
        store: &mut dyn KvStore,
        homework_id: &str,
    ) -> Result<(), RosterError> {
        let mut next = self.homework.clone();
        next.retain(|h| h.id != homework_id);
        if next.len() == self.homework.len() {
            return Err(RosterError::HomeworkNotFound);
        }
        self.commit_homework(store, next)
    }
}

fn find_class<'a>(
    classes: &'a mut [ClassGroup],
    class_id: &str,
) -> Result<&'a mut ClassGroup, RosterError> {
    classes
        .iter_mut()
        .find(|c| c.id == class_id)
        .ok_or(RosterError::ClassNotFound)
}

fn build_student(class: &ClassGroup, input: StudentInput) -> Result<Student, RosterError> {
    let name = required(&input.name, "name")?;
    let roll_no = match input.roll_no {
        Some(r) => required(&r, "rollNo")?,
        None => class.next_roll_no().to_string(),
    };
    Ok(Student {
        id: Uuid::new_v4().to_string(),
        roll_no,
        name,
        father_name: input.father_name.trim().to_string(),
    })
}
