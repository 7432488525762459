//! The block list editor.
//!
//! A single-threaded state machine over the blocks of one content document.
//! Every structural edit keeps `order` equal to position, minted ids are
//! never reused, and gap-fill content edits re-run reconciliation.

use coursekit_core::error::ParseError;
use coursekit_core::model::{
    block_id, block_id_suffix, Block, BlockData, BlockKind, ChoiceMode, ChoiceOption,
    ChoiceQuestion, ContentDocument, Gap, GapAnswerType, GapFillPayload, ItemType, LayoutHints,
    MediaPayload, MultipleChoicePayload, QuestionMeta, QuestionSettings,
};
use coursekit_core::parser::{self, DocumentWarning};
use coursekit_core::reconcile::{blank_token, next_blank_index, reconcile};

use crate::defaults::{default_payload, default_question};
use crate::display::{DisplayMap, DisplayState};
use crate::error::EditorError;
use crate::event::EditorEvent;
use crate::hooks::{AllTemplates, Confirm, TemplateCatalog};

/// Whether edits currently originate from the author or from a bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Editing,
    /// A persisted document is being loaded; content callbacks are ignored
    /// and no events are recorded.
    Loading,
}

/// Result of [`BlockEditor::load_raw`].
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { blocks: usize },
    /// The document could not be parsed; the editor holds a blank document.
    StartedBlank { error: ParseError },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Authoring state for one content document.
pub struct BlockEditor {
    item_type: ItemType,
    items: Vec<Block>,
    /// `None` once every `block-N` suffix has been minted.
    next_id_counter: Option<u64>,
    mode: EditorMode,
    display: DisplayMap,
    /// Anchor block of an insert-above awaiting its kind.
    pending_insert: Option<String>,
    events: Vec<EditorEvent>,
    templates: Box<dyn TemplateCatalog>,
}

impl std::fmt::Debug for BlockEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockEditor")
            .field("item_type", &self.item_type)
            .field("items", &self.items.len())
            .field("next_id_counter", &self.next_id_counter)
            .field("mode", &self.mode)
            .field("pending_insert", &self.pending_insert)
            .finish()
    }
}

impl BlockEditor {
    /// Empty editor with every template available.
    pub fn new(item_type: ItemType) -> Self {
        Self::with_templates(item_type, AllTemplates)
    }

    pub fn with_templates(item_type: ItemType, templates: impl TemplateCatalog + 'static) -> Self {
        Self {
            item_type,
            items: Vec::new(),
            next_id_counter: Some(1),
            mode: EditorMode::Editing,
            display: DisplayMap::default(),
            pending_insert: None,
            events: Vec::new(),
            templates: Box::new(templates),
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn blocks(&self) -> &[Block] {
        &self.items
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.items.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Suffix the next minted block id will carry, `None` when exhausted.
    pub fn next_id_counter(&self) -> Option<u64> {
        self.next_id_counter
    }

    pub fn display(&self, id: &str) -> DisplayState {
        self.display.get(id)
    }

    pub fn pending_insert(&self) -> Option<&str> {
        self.pending_insert.as_deref()
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Append a new block of `kind`. Returns its id, or `None` when the kind
    /// is not legal for the item type or its template is unavailable.
    pub fn add_block(&mut self, kind: BlockKind) -> Option<String> {
        let block = self.create_block(kind)?;
        let id = block.id.clone();
        self.items.push(block);
        self.record(EditorEvent::BlockAdded {
            block_id: id.clone(),
            kind,
        });
        Some(id)
    }

    /// Swap `id` with the block above it. `false` at the top.
    pub fn move_up(&mut self, id: &str) -> Result<bool, EditorError> {
        let from = self.position(id)?;
        if from == 0 {
            return Ok(false);
        }
        self.swap(from, from - 1);
        Ok(true)
    }

    /// Swap `id` with the block below it. `false` at the bottom.
    pub fn move_down(&mut self, id: &str) -> Result<bool, EditorError> {
        let from = self.position(id)?;
        if from + 1 >= self.items.len() {
            return Ok(false);
        }
        self.swap(from, from + 1);
        Ok(true)
    }

    /// Delete `id` once `confirm` agrees. Returns whether it was deleted.
    /// Other blocks keep their ids.
    pub fn delete(&mut self, id: &str, confirm: &dyn Confirm) -> Result<bool, EditorError> {
        let pos = self.position(id)?;
        if !confirm.confirm(&format!("Delete block {id}?")) {
            tracing::debug!(block_id = id, "delete not confirmed");
            return Ok(false);
        }

        self.items.remove(pos);
        self.resequence();
        self.display.remove(id);
        if self.pending_insert.as_deref() == Some(id) {
            self.pending_insert = None;
        }
        self.record(EditorEvent::BlockDeleted {
            block_id: id.to_string(),
        });
        Ok(true)
    }

    /// First step of insert-above: remember the anchor and return the kinds
    /// the author may choose from.
    pub fn begin_insert_above(&mut self, id: &str) -> Result<Vec<BlockKind>, EditorError> {
        self.position(id)?;
        self.pending_insert = Some(id.to_string());
        Ok(self.item_type.allowed_kinds().to_vec())
    }

    /// Second step of insert-above. A rejected kind leaves the insert pending.
    pub fn choose_insert_kind(&mut self, kind: BlockKind) -> Result<Option<String>, EditorError> {
        let anchor = self
            .pending_insert
            .clone()
            .ok_or(EditorError::NoPendingInsert)?;
        let pos = self.position(&anchor)?;
        let Some(block) = self.create_block(kind) else {
            return Ok(None);
        };

        self.pending_insert = None;
        let id = block.id.clone();
        self.items.insert(pos, block);
        self.resequence();
        self.record(EditorEvent::BlockAdded {
            block_id: id.clone(),
            kind,
        });
        Ok(Some(id))
    }

    /// Abandon a pending insert. Returns whether one was pending.
    pub fn cancel_insert(&mut self) -> bool {
        self.pending_insert.take().is_some()
    }

    /// Insert a block of `kind` directly above `id`.
    pub fn insert_above(&mut self, id: &str, kind: BlockKind) -> Result<Option<String>, EditorError> {
        self.begin_insert_above(id)?;
        let inserted = self.choose_insert_kind(kind);
        self.pending_insert = None;
        inserted
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    pub fn collapse(&mut self, id: &str) -> Result<(), EditorError> {
        self.position(id)?;
        self.display.set_collapsed(id, true);
        Ok(())
    }

    pub fn expand(&mut self, id: &str) -> Result<(), EditorError> {
        self.position(id)?;
        self.display.set_collapsed(id, false);
        Ok(())
    }

    /// Returns whether `id` is now fullscreen.
    pub fn toggle_fullscreen(&mut self, id: &str) -> Result<bool, EditorError> {
        self.position(id)?;
        Ok(self.display.toggle_fullscreen(id))
    }

    // -----------------------------------------------------------------------
    // Loading and saving
    // -----------------------------------------------------------------------

    /// Replace the editor's contents with `doc` and enter loading mode.
    /// Hosts that populate rich-text widgets asynchronously call
    /// [`finish_load`](Self::finish_load) once population is done.
    pub fn begin_load(&mut self, doc: ContentDocument) {
        self.mode = EditorMode::Loading;
        self.item_type = doc.item_type;
        self.items = doc.blocks;
        self.resequence();
        self.next_id_counter = self
            .items
            .iter()
            .filter_map(|b| block_id_suffix(&b.id))
            .max()
            .map_or(Some(1), |n| n.checked_add(1));
        self.display.clear();
        self.pending_insert = None;
    }

    pub fn finish_load(&mut self) {
        self.mode = EditorMode::Editing;
    }

    /// Load `doc` in one step.
    pub fn load(&mut self, doc: ContentDocument) {
        self.begin_load(doc);
        self.finish_load();
    }

    /// Load a persisted document, migrating legacy shapes. On failure the
    /// editor starts from a blank document of its current item type.
    pub fn load_raw(&mut self, raw: &str) -> LoadOutcome {
        match parser::load(raw, Some(self.item_type)) {
            Ok(doc) => {
                let blocks = doc.blocks.len();
                self.load(doc);
                LoadOutcome::Loaded { blocks }
            }
            Err(error) => {
                tracing::warn!(item_type = %self.item_type, "cannot load document, starting from blank: {error}");
                self.load(ContentDocument::new(self.item_type));
                LoadOutcome::StartedBlank { error }
            }
        }
    }

    /// The document as currently edited.
    pub fn to_document(&self) -> ContentDocument {
        ContentDocument {
            item_type: self.item_type,
            blocks: self.items.clone(),
        }
    }

    /// Serialized document, ready to persist.
    pub fn save(&self) -> String {
        parser::serialize(&self.to_document())
    }

    pub fn lint(&self) -> Vec<DocumentWarning> {
        parser::lint(&self.to_document())
    }

    /// Drain recorded change events.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Change callback of the rich-text collaborator. Ignored while loading.
    ///
    /// Sets the body of media blocks, the prompt of open questions and the
    /// content of gap-fill questions, whose gaps are then reconciled.
    pub fn update_content(&mut self, id: &str, text: impl Into<String>) -> Result<(), EditorError> {
        if self.mode == EditorMode::Loading {
            tracing::trace!(block_id = id, "ignoring content change while loading");
            return Ok(());
        }

        let text = text.into();
        let block = self.block_mut(id)?;
        let reconciled = match &mut block.data {
            BlockData::Media(p) => {
                p.content = text;
                None
            }
            BlockData::OpenQuestion(p) => {
                p.prompt = text;
                None
            }
            BlockData::GapFill(p) => {
                p.content = text;
                let before: Vec<u32> = p.gaps.iter().map(|g| g.index).collect();
                p.gaps = reconcile(&p.content, &p.gaps);
                let after: Vec<u32> = p.gaps.iter().map(|g| g.index).collect();
                (before != after).then_some(after)
            }
            BlockData::MultipleChoice(_) => {
                return Err(EditorError::WrongPayload {
                    block_id: id.to_string(),
                    expected: "text",
                })
            }
        };

        self.changed(id);
        if let Some(indices) = reconciled {
            self.record(EditorEvent::GapsReconciled {
                block_id: id.to_string(),
                indices,
            });
        }
        Ok(())
    }

    /// Append the next free `[[blankN]]` token to a gap-fill block and
    /// return its index.
    pub fn insert_blank(&mut self, id: &str) -> Result<u32, EditorError> {
        let payload = self.gap_fill_mut(id)?;
        let Some(index) = next_blank_index(&payload.content) else {
            return Err(EditorError::GapIndicesExhausted(id.to_string()));
        };
        payload.content.push_str(&blank_token(index));
        payload.gaps = reconcile(&payload.content, &payload.gaps);
        let indices = payload.gaps.iter().map(|g| g.index).collect();

        self.changed(id);
        self.record(EditorEvent::GapsReconciled {
            block_id: id.to_string(),
            indices,
        });
        Ok(index)
    }

    pub fn set_gap_answer(&mut self, id: &str, index: u32, answer: impl Into<String>) -> Result<(), EditorError> {
        self.gap_mut(id, index)?.correct_answer = answer.into();
        self.changed(id);
        Ok(())
    }

    pub fn set_gap_alternatives(&mut self, id: &str, index: u32, alternatives: Vec<String>) -> Result<(), EditorError> {
        self.gap_mut(id, index)?.alternative_answers = alternatives;
        self.changed(id);
        Ok(())
    }

    pub fn set_gap_hint(&mut self, id: &str, index: u32, hint: impl Into<String>) -> Result<(), EditorError> {
        self.gap_mut(id, index)?.hint = hint.into();
        self.changed(id);
        Ok(())
    }

    pub fn set_gap_answer_type(&mut self, id: &str, answer_type: GapAnswerType) -> Result<(), EditorError> {
        self.gap_fill_mut(id)?.answer_type = answer_type;
        self.changed(id);
        Ok(())
    }

    pub fn set_case_sensitive(&mut self, id: &str, case_sensitive: bool) -> Result<(), EditorError> {
        self.gap_fill_mut(id)?.case_sensitive = case_sensitive;
        self.changed(id);
        Ok(())
    }

    pub fn set_settings(&mut self, id: &str, settings: QuestionSettings) -> Result<(), EditorError> {
        self.meta_mut(id)?.settings = Some(settings);
        self.changed(id);
        Ok(())
    }

    /// Set the point value, in the settings when present.
    pub fn set_points(&mut self, id: &str, points: u32) -> Result<(), EditorError> {
        let meta = self.meta_mut(id)?;
        match meta.settings.as_mut() {
            Some(settings) => settings.points = points,
            None => meta.points = points,
        }
        self.changed(id);
        Ok(())
    }

    pub fn set_teacher_guidance(&mut self, id: &str, guidance: impl Into<String>) -> Result<(), EditorError> {
        self.meta_mut(id)?.teacher_guidance = guidance.into();
        self.changed(id);
        Ok(())
    }

    pub fn set_caption(&mut self, id: &str, caption: impl Into<String>) -> Result<(), EditorError> {
        self.media_mut(id)?.caption = caption.into();
        self.changed(id);
        Ok(())
    }

    /// Set the file-storage reference of a media block.
    pub fn set_source(&mut self, id: &str, source: Option<String>) -> Result<(), EditorError> {
        self.media_mut(id)?.source = source;
        self.changed(id);
        Ok(())
    }

    pub fn set_layout(&mut self, id: &str, layout: LayoutHints) -> Result<(), EditorError> {
        self.media_mut(id)?.layout = layout;
        self.changed(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Choice questions
    // -----------------------------------------------------------------------

    /// Append a blank question and return its id.
    pub fn add_question(&mut self, id: &str) -> Result<String, EditorError> {
        let payload = self.choice_mut(id)?;
        let taken = |n: u64| payload.questions.iter().any(|q| q.id == format!("q{n}"));
        let next = payload
            .questions
            .iter()
            .filter_map(|q| q.id.strip_prefix('q')?.parse::<u64>().ok())
            .max()
            .map_or(Some(1), |n| n.checked_add(1))
            .or_else(|| (1..=u64::MAX).find(|n| !taken(*n)))
            .unwrap_or(0);
        let question_id = format!("q{next}");
        payload.questions.push(default_question(question_id.clone()));
        self.changed(id);
        Ok(question_id)
    }

    pub fn remove_question(&mut self, id: &str, question_id: &str) -> Result<(), EditorError> {
        let payload = self.choice_mut(id)?;
        let pos = payload
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| unknown_question(id, question_id))?;
        payload.questions.remove(pos);
        self.changed(id);
        Ok(())
    }

    pub fn set_question_stem(&mut self, id: &str, question_id: &str, stem: impl Into<String>) -> Result<(), EditorError> {
        self.question_mut(id, question_id)?.stem = stem.into();
        self.changed(id);
        Ok(())
    }

    /// Switching to `single` keeps only the first correct option.
    pub fn set_choice_mode(&mut self, id: &str, question_id: &str, mode: ChoiceMode) -> Result<(), EditorError> {
        let question = self.question_mut(id, question_id)?;
        question.answer_type = mode;
        if mode == ChoiceMode::Single {
            let mut seen = false;
            for option in question.options.iter_mut().filter(|o| o.correct) {
                option.correct = !seen;
                seen = true;
            }
        }
        self.changed(id);
        Ok(())
    }

    pub fn set_randomize(&mut self, id: &str, question_id: &str, randomize: bool) -> Result<(), EditorError> {
        self.question_mut(id, question_id)?.randomize = randomize;
        self.changed(id);
        Ok(())
    }

    /// Append an option and return its index.
    pub fn add_option(&mut self, id: &str, question_id: &str, text: impl Into<String>) -> Result<u32, EditorError> {
        let question = self.question_mut(id, question_id)?;
        let index = question.next_option_index();
        question.options.push(ChoiceOption {
            index,
            text: text.into(),
            correct: false,
        });
        self.changed(id);
        Ok(index)
    }

    /// Remove an option. Remaining options keep their indices.
    pub fn remove_option(&mut self, id: &str, question_id: &str, index: u32) -> Result<(), EditorError> {
        let question = self.question_mut(id, question_id)?;
        let pos = question
            .options
            .iter()
            .position(|o| o.index == index)
            .ok_or_else(|| unknown_option(question_id, index))?;
        question.options.remove(pos);
        self.changed(id);
        Ok(())
    }

    pub fn set_option_text(
        &mut self,
        id: &str,
        question_id: &str,
        index: u32,
        text: impl Into<String>,
    ) -> Result<(), EditorError> {
        let question = self.question_mut(id, question_id)?;
        question
            .options
            .iter_mut()
            .find(|o| o.index == index)
            .ok_or_else(|| unknown_option(question_id, index))?
            .text = text.into();
        self.changed(id);
        Ok(())
    }

    /// Mark an option correct or not. In `single` mode marking one correct
    /// clears the others.
    pub fn set_option_correct(
        &mut self,
        id: &str,
        question_id: &str,
        index: u32,
        correct: bool,
    ) -> Result<(), EditorError> {
        let question = self.question_mut(id, question_id)?;
        if !question.has_option(index) {
            return Err(unknown_option(question_id, index));
        }
        let exclusive = correct && question.answer_type == ChoiceMode::Single;
        for option in question.options.iter_mut() {
            if option.index == index {
                option.correct = correct;
            } else if exclusive {
                option.correct = false;
            }
        }
        self.changed(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn create_block(&mut self, kind: BlockKind) -> Option<Block> {
        if !self.item_type.allows(kind) {
            tracing::warn!(item_type = %self.item_type, %kind, "block type not allowed, skipping");
            return None;
        }
        if !self.templates.has_template(kind) {
            tracing::warn!(%kind, "no template for block type, skipping");
            return None;
        }

        let Some(suffix) = self.next_id_counter else {
            tracing::warn!(%kind, "block ids exhausted, skipping");
            return None;
        };
        self.next_id_counter = suffix.checked_add(1);
        let id = block_id(suffix);
        Some(Block {
            id,
            kind,
            order: self.items.len(),
            data: default_payload(self.item_type, kind),
        })
    }

    fn swap(&mut self, from: usize, to: usize) {
        self.items.swap(from, to);
        self.resequence();
        let moved = self.items[to].id.clone();
        self.record(EditorEvent::BlockMoved {
            block_id: moved,
            from,
            to,
        });
    }

    fn resequence(&mut self) {
        for (i, block) in self.items.iter_mut().enumerate() {
            block.order = i;
        }
    }

    fn record(&mut self, event: EditorEvent) {
        if self.mode == EditorMode::Editing {
            self.events.push(event);
        }
    }

    fn changed(&mut self, id: &str) {
        self.record(EditorEvent::BlockChanged {
            block_id: id.to_string(),
        });
    }

    fn position(&self, id: &str) -> Result<usize, EditorError> {
        self.items
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| EditorError::UnknownBlock(id.to_string()))
    }

    fn block_mut(&mut self, id: &str) -> Result<&mut Block, EditorError> {
        self.items
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| EditorError::UnknownBlock(id.to_string()))
    }

    fn media_mut(&mut self, id: &str) -> Result<&mut MediaPayload, EditorError> {
        match &mut self.block_mut(id)?.data {
            BlockData::Media(p) => Ok(p),
            _ => Err(wrong_payload(id, "media")),
        }
    }

    fn gap_fill_mut(&mut self, id: &str) -> Result<&mut GapFillPayload, EditorError> {
        match &mut self.block_mut(id)?.data {
            BlockData::GapFill(p) => Ok(p),
            _ => Err(wrong_payload(id, "gap-fill")),
        }
    }

    fn choice_mut(&mut self, id: &str) -> Result<&mut MultipleChoicePayload, EditorError> {
        match &mut self.block_mut(id)?.data {
            BlockData::MultipleChoice(p) => Ok(p),
            _ => Err(wrong_payload(id, "multiple-choice")),
        }
    }

    fn meta_mut(&mut self, id: &str) -> Result<&mut QuestionMeta, EditorError> {
        self.block_mut(id)?
            .data
            .question_meta_mut()
            .ok_or_else(|| wrong_payload(id, "question"))
    }

    fn gap_mut(&mut self, id: &str, index: u32) -> Result<&mut Gap, EditorError> {
        self.gap_fill_mut(id)?
            .gap_mut(index)
            .ok_or_else(|| EditorError::UnknownGap {
                block_id: id.to_string(),
                index,
            })
    }

    fn question_mut(&mut self, id: &str, question_id: &str) -> Result<&mut ChoiceQuestion, EditorError> {
        self.choice_mut(id)?
            .question_mut(question_id)
            .ok_or_else(|| unknown_question(id, question_id))
    }
}

fn wrong_payload(id: &str, expected: &'static str) -> EditorError {
    EditorError::WrongPayload {
        block_id: id.to_string(),
        expected,
    }
}

fn unknown_question(id: &str, question_id: &str) -> EditorError {
    EditorError::UnknownQuestion {
        block_id: id.to_string(),
        question_id: question_id.to_string(),
    }
}

fn unknown_option(question_id: &str, index: u32) -> EditorError {
    EditorError::UnknownOption {
        question_id: question_id.to_string(),
        index,
    }
}
