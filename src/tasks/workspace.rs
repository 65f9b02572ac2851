//! Task and inbox operations against a Notion workspace.
//!
//! Each operation validates its input, resolves identifiers and people, then
//! brackets one or two store calls with the property and Markdown codecs.
//! Nothing is retried and nothing is compensated: when a later step fails,
//! earlier reads are simply discarded.

use crate::config::ContentLimits;
use crate::error::{Error, Result};
use crate::markdown::{blocks_to_markdown, create_log_blocks, markdown_to_blocks};
use crate::notion::types::{
    plain_text, Block, DatabaseQuery, Filter, Page, PageUpdate, PropertyMap, PropertyValue,
};
use crate::notion::{NotionApi, MAX_BLOCKS_PER_REQUEST, MAX_PAGE_SIZE};
use crate::tasks::models::{
    InboxDetail, InboxFields, InboxItem, LogReceipt, LogType, Priority, Task, TaskDetail,
    TaskFields, TaskStatus,
};
use crate::tasks::people::resolve_people;
use crate::tasks::properties::{
    inbox_from_page, inbox_to_properties, task_from_page, task_to_properties, InboxSchema,
    TaskSchema,
};
use crate::tasks::resolver::{inbox_page_id, resolve_task_id};
use std::sync::Arc;
use tracing::info;

/// Largest number of records a list operation returns.
pub const MAX_LIST_LIMIT: usize = 500;

/// Databases, property names and limits the workspace runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Database holding tasks.
    pub tasks_database_id: String,
    /// Database holding inbox items.
    pub inbox_database_id: String,
    /// Property names of the tasks database.
    pub task_schema: TaskSchema,
    /// Property names of the inbox database.
    pub inbox_schema: InboxSchema,
    /// Content limits.
    pub limits: ContentLimits,
}

/// Input for [`Workspace::create_task`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Task title; required.
    pub title: String,
    /// Status code or label; defaults to not-started.
    pub status: Option<String>,
    /// Priority code or label.
    pub priority: Option<String>,
    /// Person references for the assignees.
    pub assignees: Vec<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Page body as Markdown.
    pub content: Option<String>,
}

/// Input for [`Workspace::update_task`]. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// New title.
    pub title: Option<String>,
    /// New priority code or label.
    pub priority: Option<String>,
    /// Replacement assignees (person references); empty leaves them unchanged.
    pub assignees: Vec<String>,
    /// Replacement tags; empty leaves them unchanged.
    pub tags: Vec<String>,
}

/// Input for [`Workspace::create_inbox`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewInboxItem {
    /// Item title; required.
    pub title: String,
    /// Person references for the authors.
    pub authors: Vec<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Page body as Markdown.
    pub content: Option<String>,
}

/// Filter for [`Workspace::list_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Only tasks with this status (code or label).
    pub status: Option<String>,
    /// Only tasks assigned to this person reference.
    pub assignee: Option<String>,
    /// Only tasks carrying this tag.
    pub tag: Option<String>,
    /// Maximum number of tasks.
    pub limit: Option<usize>,
}

/// Filter for [`Workspace::list_inbox`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxQuery {
    /// Only items carrying this tag.
    pub tag: Option<String>,
    /// Maximum number of items.
    pub limit: Option<usize>,
}

/// The task board and inbox of one Notion workspace.
#[derive(Clone)]
pub struct Workspace {
    api: Arc<dyn NotionApi>,
    settings: WorkspaceSettings,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl Workspace {
    /// Create a workspace over a store.
    pub fn new(api: Arc<dyn NotionApi>, settings: WorkspaceSettings) -> Self {
        Self { api, settings }
    }

    /// The settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    /// Create a task, with an optional Markdown body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty title or an unknown status
    /// or priority, person resolution errors, and store errors.
    pub async fn create_task(&self, new: NewTask) -> Result<Task> {
        let title = required_title(&new.title)?;
        let status = match new.status.as_deref() {
            Some(status) => TaskStatus::parse(status)?,
            None => TaskStatus::NotStarted,
        };
        let priority = new.priority.as_deref().map(Priority::parse).transpose()?;
        let assignees = resolve_people(self.api.as_ref(), &new.assignees).await?;

        let fields = TaskFields {
            title: Some(title),
            status: Some(status),
            priority,
            assignees,
            tags: clean_tags(new.tags),
        };
        let properties = task_to_properties(&fields, &self.settings.task_schema);
        let blocks = new.content.as_deref().map(markdown_to_blocks).unwrap_or_default();
        let page = self.create_page(&self.settings.tasks_database_id, properties, blocks).await?;
        let task = task_from_page(&page, &self.settings.task_schema)?;
        info!(page_id = %task.page_id, key = ?task.key, "Created task");
        Ok(task)
    }

    /// Fetch a task by page id or human key.
    ///
    /// # Errors
    ///
    /// Returns resolution errors, store errors, and property parse errors.
    pub async fn get_task(&self, id: &str) -> Result<Task> {
        let page = self.task_page(id).await?;
        task_from_page(&page, &self.settings.task_schema)
    }

    /// Fetch a task with its body rendered as Markdown.
    ///
    /// At most `max_blocks` top-level blocks are read (default and ceiling
    /// from [`ContentLimits`]); `truncated` reports whether more remain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a zero `max_blocks`, plus the errors
    /// of [`Workspace::get_task`].
    pub async fn get_task_detail(&self, id: &str, max_blocks: Option<usize>) -> Result<TaskDetail> {
        let max_blocks = self.max_blocks(max_blocks)?;
        let task = self.get_task(id).await?;
        let (content, truncated) = self.read_body(&task.page_id, max_blocks).await?;
        Ok(TaskDetail { task, content, truncated })
    }

    /// Overwrite the given fields of a task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no field is given or the priority is
    /// unknown, plus resolution and store errors.
    pub async fn update_task(&self, id: &str, changes: TaskChanges) -> Result<Task> {
        let priority = changes.priority.as_deref().map(Priority::parse).transpose()?;
        let title = changes.title.as_deref().map(required_title).transpose()?;
        let tags = clean_tags(changes.tags);
        if title.is_none() && priority.is_none() && changes.assignees.is_empty() && tags.is_empty() {
            return Err(Error::validation("no fields to update"));
        }

        let page_id = self.resolve_task(id).await?;
        let assignees = resolve_people(self.api.as_ref(), &changes.assignees).await?;
        let fields = TaskFields { title, status: None, priority, assignees, tags };
        let properties = task_to_properties(&fields, &self.settings.task_schema);
        self.write_task(&page_id, properties).await
    }

    /// Set a task's status.
    ///
    /// The status is checked before anything is sent to Notion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown status, plus resolution
    /// and store errors.
    pub async fn update_task_status(&self, id: &str, status: &str) -> Result<Task> {
        let status = TaskStatus::parse(status)?;
        let page_id = self.resolve_task(id).await?;
        let mut properties = PropertyMap::new();
        properties.insert(
            self.settings.task_schema.status.clone(),
            PropertyValue::Select(Some(status.label().to_string())),
        );
        let task = self.write_task(&page_id, properties).await?;
        info!(page_id = %page_id, status = status.code(), "Updated task status");
        Ok(task)
    }

    /// Archive or restore a task. Repeating the call is harmless.
    ///
    /// A human key only resolves while the task is live: archiving twice,
    /// or restoring, needs the page id returned by the first call.
    ///
    /// # Errors
    ///
    /// Returns resolution and store errors.
    pub async fn set_task_archived(&self, id: &str, archived: bool) -> Result<Task> {
        let page_id = self.resolve_task(id).await?;
        let page = self.api.update_page(&page_id, PageUpdate::archived(archived)).await?;
        info!(page_id = %page_id, archived, "Set task archived flag");
        task_from_page(&page, &self.settings.task_schema)
    }

    /// Append a work-log entry to the end of a task's body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for empty content or author or an unknown
    /// log type, plus resolution and store errors.
    pub async fn add_task_log(
        &self,
        id: &str,
        content: &str,
        author: &str,
        log_type: &str,
    ) -> Result<LogReceipt> {
        let log_type = LogType::parse(log_type)?;
        if author.trim().is_empty() {
            return Err(Error::validation("author must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(Error::validation("log content must not be empty"));
        }

        let page_id = self.resolve_task(id).await?;
        let blocks = create_log_blocks(content, author, log_type);
        let heading = blocks.first().and_then(Block::rich_text).map(plain_text).unwrap_or_default();
        let appended = blocks.len();
        self.append(&page_id, blocks).await?;
        info!(page_id = %page_id, log_type = log_type.code(), blocks = appended, "Appended task log");
        Ok(LogReceipt { page_id, heading, blocks_appended: appended })
    }

    /// List live tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown status, person resolution
    /// errors, store errors and property parse errors.
    pub async fn list_tasks(&self, query: TaskQuery) -> Result<Vec<Task>> {
        let schema = &self.settings.task_schema;
        let limit = self.list_limit(query.limit)?;
        let mut filters = Vec::new();
        if let Some(status) = query.status.as_deref() {
            let status = TaskStatus::parse(status)?;
            filters.push(Filter::SelectEquals {
                property: schema.status.clone(),
                value: status.label().to_string(),
            });
        }
        if let Some(tag) = non_blank(query.tag.as_deref()) {
            filters.push(Filter::MultiSelectContains { property: schema.tags.clone(), value: tag });
        }
        if let Some(assignee) = non_blank(query.assignee.as_deref()) {
            let ids = resolve_people(self.api.as_ref(), &[assignee]).await?;
            for person_id in ids {
                filters.push(Filter::PeopleContains { property: schema.assignees.clone(), person_id });
            }
        }

        let pages = self.query_pages(&self.settings.tasks_database_id, Filter::all(filters), limit).await?;
        pages.iter().map(|page| task_from_page(page, schema)).collect()
    }

    /// Create an inbox item, with an optional Markdown body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty title, person resolution
    /// errors, and store errors.
    pub async fn create_inbox(&self, new: NewInboxItem) -> Result<InboxItem> {
        let title = required_title(&new.title)?;
        let authors = resolve_people(self.api.as_ref(), &new.authors).await?;
        let fields = InboxFields { title: Some(title), authors, tags: clean_tags(new.tags) };
        let properties = inbox_to_properties(&fields, &self.settings.inbox_schema);
        let blocks = new.content.as_deref().map(markdown_to_blocks).unwrap_or_default();
        let page = self.create_page(&self.settings.inbox_database_id, properties, blocks).await?;
        let item = inbox_from_page(&page, &self.settings.inbox_schema)?;
        info!(page_id = %item.page_id, "Created inbox item");
        Ok(item)
    }

    /// Fetch an inbox item by page id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an id that is not a page id, plus
    /// store and property parse errors.
    pub async fn get_inbox(&self, id: &str) -> Result<InboxItem> {
        let page_id = inbox_page_id(id)?;
        let page = self.api.retrieve_page(&page_id).await?;
        inbox_from_page(&page, &self.settings.inbox_schema)
    }

    /// Fetch an inbox item with its body rendered as Markdown.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Workspace::get_inbox`] and
    /// [`Error::Validation`] for a zero `max_blocks`.
    pub async fn get_inbox_detail(&self, id: &str, max_blocks: Option<usize>) -> Result<InboxDetail> {
        let max_blocks = self.max_blocks(max_blocks)?;
        let item = self.get_inbox(id).await?;
        let (content, truncated) = self.read_body(&item.page_id, max_blocks).await?;
        Ok(InboxDetail { item, content, truncated })
    }

    /// Archive or restore an inbox item. Repeating the call is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an id that is not a page id, plus
    /// store errors.
    pub async fn set_inbox_archived(&self, id: &str, archived: bool) -> Result<InboxItem> {
        let page_id = inbox_page_id(id)?;
        let page = self.api.update_page(&page_id, PageUpdate::archived(archived)).await?;
        info!(page_id = %page_id, archived, "Set inbox archived flag");
        inbox_from_page(&page, &self.settings.inbox_schema)
    }

    /// List live inbox items, newest first.
    ///
    /// # Errors
    ///
    /// Returns store errors and property parse errors.
    pub async fn list_inbox(&self, query: InboxQuery) -> Result<Vec<InboxItem>> {
        let schema = &self.settings.inbox_schema;
        let limit = self.list_limit(query.limit)?;
        let filter = non_blank(query.tag.as_deref())
            .map(|tag| Filter::MultiSelectContains { property: schema.tags.clone(), value: tag });
        let pages = self.query_pages(&self.settings.inbox_database_id, filter, limit).await?;
        pages.iter().map(|page| inbox_from_page(page, schema)).collect()
    }

    async fn resolve_task(&self, id: &str) -> Result<String> {
        resolve_task_id(
            self.api.as_ref(),
            &self.settings.tasks_database_id,
            &self.settings.task_schema,
            id,
        )
        .await
    }

    async fn task_page(&self, id: &str) -> Result<Page> {
        let page_id = self.resolve_task(id).await?;
        self.api.retrieve_page(&page_id).await
    }

    async fn write_task(&self, page_id: &str, properties: PropertyMap) -> Result<Task> {
        let page = self.api.update_page(page_id, PageUpdate::properties(properties)).await?;
        task_from_page(&page, &self.settings.task_schema)
    }

    /// Create a page, sending blocks past the per-request limit as appends.
    async fn create_page(
        &self,
        database_id: &str,
        properties: PropertyMap,
        mut blocks: Vec<Block>,
    ) -> Result<Page> {
        let rest = blocks.split_off(blocks.len().min(MAX_BLOCKS_PER_REQUEST));
        let page = self.api.create_page(database_id, properties, blocks).await?;
        self.append(&page.id, rest).await?;
        Ok(page)
    }

    /// Append blocks in chunks the store accepts.
    async fn append(&self, page_id: &str, blocks: Vec<Block>) -> Result<()> {
        for chunk in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            self.api.append_block_children(page_id, chunk.to_vec()).await?;
        }
        Ok(())
    }

    /// Read up to `max_blocks` top-level blocks and render them.
    async fn read_body(&self, page_id: &str, max_blocks: usize) -> Result<(String, bool)> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        let truncated = loop {
            let page_size = (max_blocks - blocks.len()).min(MAX_PAGE_SIZE);
            let page = self.api.list_block_children(page_id, cursor.as_deref(), page_size).await?;
            blocks.extend(page.results);
            let next = page.next_cursor.filter(|_| page.has_more);
            if blocks.len() >= max_blocks {
                blocks.truncate(max_blocks);
                break next.is_some();
            }
            match next {
                Some(next) => cursor = Some(next),
                None => break false,
            }
        };
        Ok((blocks_to_markdown(&blocks), truncated))
    }

    /// Query live pages, newest first, following cursors up to `limit`.
    async fn query_pages(&self, database_id: &str, filter: Option<Filter>, limit: usize) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let query = DatabaseQuery {
                filter: filter.clone(),
                newest_first: true,
                start_cursor: cursor.take(),
                page_size: Some((limit - pages.len()).min(MAX_PAGE_SIZE)),
            };
            let response = self.api.query_database(database_id, query).await?;
            pages.extend(response.results);
            match response.next_cursor.filter(|_| response.has_more) {
                Some(next) if pages.len() < limit => cursor = Some(next),
                _ => break,
            }
        }
        pages.truncate(limit);
        Ok(pages)
    }

    fn max_blocks(&self, requested: Option<usize>) -> Result<usize> {
        let limits = self.settings.limits;
        match requested {
            Some(0) => Err(Error::validation("max_blocks must be at least 1")),
            Some(n) => Ok(n.min(limits.max_blocks_ceiling)),
            None => Ok(limits.default_max_blocks),
        }
    }

    fn list_limit(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            Some(0) => Err(Error::validation("limit must be at least 1")),
            Some(n) => Ok(n.min(MAX_LIST_LIMIT)),
            None => Ok(self.settings.limits.default_list_limit.min(MAX_LIST_LIMIT)),
        }
    }
}

fn required_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("title must not be empty"));
    }
    Ok(title.to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Trim tags, dropping blanks and repeats.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}
