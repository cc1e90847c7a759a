//! Numbered console menus.
//!
//! Each [`Screen`] is one menu; its handler reads a choice, runs at most one
//! operation and returns the screen to show next. Operation failures are
//! printed and the loop carries on; only a lost connection or closed input
//! ends it.

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::{debug, error, info};

use messenger_api::messages::MessageWindow;
use messenger_api::{MessengerError, Session, accounts, chats, lists, messages};
use messenger_db::Database;
use messenger_types::api::{LoginRequest, RegisterRequest};
use messenger_types::models::{AccountDeletion, ChatSummary, ListKind, Message};

use crate::console::{Console, InputClosed, Pick};

const RULE: &str = "---------";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Logged out: create user, log in, exit.
    Main,
    /// Logged in: lists, chats, account.
    User(Session),
    Chats(Session),
    /// "YOUR CHATS": choose a chat to open.
    ChatPicker(Session),
    Messages {
        session: Session,
        chat_id: i64,
        window: MessageWindow,
    },
    Exit,
}

pub struct App<'a, R, W> {
    db: &'a Database,
    console: Console<R, W>,
}

impl<'a, R: BufRead, W: Write> App<'a, R, W> {
    pub fn new(db: &'a Database, console: Console<R, W>) -> Self {
        Self { db, console }
    }

    /// Runs menus until the user exits or input ends.
    pub fn run(&mut self) -> Result<()> {
        let mut screen = Screen::Main;
        while screen != Screen::Exit {
            screen = match self.step(screen) {
                Ok(next) => next,
                Err(err) if err.is::<InputClosed>() => {
                    debug!("input closed, leaving menus");
                    Screen::Exit
                }
                Err(err) => return Err(err),
            };
        }
        Ok(())
    }

    pub fn step(&mut self, screen: Screen) -> Result<Screen> {
        match screen {
            Screen::Main => self.main_menu(),
            Screen::User(session) => self.user_menu(session),
            Screen::Chats(session) => self.chat_menu(session),
            Screen::ChatPicker(session) => self.chat_picker(session),
            Screen::Messages {
                session,
                chat_id,
                window,
            } => self.message_menu(session, chat_id, window),
            Screen::Exit => Ok(Screen::Exit),
        }
    }

    // -- Main --

    fn main_menu(&mut self) -> Result<Screen> {
        self.console.line("\nMAIN MENU")?;
        self.console.line(RULE)?;
        self.console.line("1. Create user")?;
        self.console.line("2. Log in")?;
        self.console.line("0. < EXIT")?;

        match self.console.read_choice()? {
            0 => Ok(Screen::Exit),
            1 => {
                self.create_user()?;
                Ok(Screen::Main)
            }
            2 => Ok(self.log_in()?.map_or(Screen::Main, Screen::User)),
            _ => self.unrecognized(Screen::Main),
        }
    }

    fn create_user(&mut self) -> Result<()> {
        let req = RegisterRequest {
            login: self.console.prompt("\tEnter user login: ")?,
            password: self.console.prompt("\tEnter user password: ")?,
            phone: self.console.prompt("\tEnter user phone: ")?,
        };
        if self.outcome(accounts::register(self.db, &req))?.is_some() {
            self.console.line("User successfully created!")?;
        }
        Ok(())
    }

    fn log_in(&mut self) -> Result<Option<Session>> {
        let req = LoginRequest {
            login: self.console.prompt("\tEnter user login: ")?,
            password: self.console.prompt("\tEnter user password: ")?,
        };
        let session = self.outcome(accounts::login(self.db, &req))?;
        if session.is_none() {
            self.console.line("")?;
        }
        Ok(session)
    }

    // -- User --

    fn user_menu(&mut self, session: Session) -> Result<Screen> {
        self.console.line(format!("\nWelcome {}!", session.login()))?;
        self.console.line("MAIN MENU")?;
        self.console.line(RULE)?;
        self.console.line("1. View contacts")?;
        self.console.line("2. Add contact")?;
        self.console.line("3. Remove contact")?;
        self.console.line("4. View blocked users")?;
        self.console.line("5. Block user")?;
        self.console.line("6. Unblock user")?;
        self.console.line("7. Chat Menu")?;
        self.console.line("8. Write a new message")?;
        self.console.line("9. Delete your account")?;
        self.console.line(".........................")?;
        self.console.line("0. Log out")?;

        match self.console.read_choice()? {
            0 => {
                info!(login = session.login(), "logged out");
                return Ok(Screen::Main);
            }
            1 => self.show_list(&session, ListKind::Contact)?,
            2 => self.add_to_list(&session, ListKind::Contact)?,
            3 => self.remove_from_list(&session, ListKind::Contact)?,
            4 => self.show_list(&session, ListKind::Block)?,
            5 => self.add_to_list(&session, ListKind::Block)?,
            6 => self.remove_from_list(&session, ListKind::Block)?,
            7 => return Ok(Screen::Chats(session)),
            8 => self.write_new_message(&session)?,
            9 => {
                if self.delete_account(&session)? {
                    return Ok(Screen::Main);
                }
            }
            _ => return self.unrecognized(Screen::User(session)),
        }
        Ok(Screen::User(session))
    }

    fn show_list(&mut self, session: &Session, kind: ListKind) -> Result<()> {
        let heading = match kind {
            ListKind::Contact => "\nYour Contacts:",
            ListKind::Block => "\nYour Blocked Users:",
        };
        self.console.line(heading)?;
        if let Some(members) = self.outcome(lists::members(self.db, session, kind))? {
            for member in members {
                self.console.line(member)?;
            }
        }
        Ok(())
    }

    fn add_to_list(&mut self, session: &Session, kind: ListKind) -> Result<()> {
        let label = match kind {
            ListKind::Contact => "\tEnter user to add: ",
            ListKind::Block => "\tEnter user to block: ",
        };
        let target = self.console.prompt(label)?;
        if self.outcome(lists::add(self.db, session, kind, &target))?.is_some() {
            let done = match kind {
                ListKind::Contact => format!("Successfully added {} to your contacts", target.trim()),
                ListKind::Block => format!("Successfully blocked {}", target.trim()),
            };
            self.console.line(done)?;
        }
        Ok(())
    }

    fn remove_from_list(&mut self, session: &Session, kind: ListKind) -> Result<()> {
        let label = match kind {
            ListKind::Contact => "\tEnter user to remove: ",
            ListKind::Block => "\tEnter user to unblock: ",
        };
        let target = self.console.prompt(label)?;
        if self.outcome(lists::remove(self.db, session, kind, &target))?.is_some() {
            let done = match kind {
                ListKind::Contact => format!("Successfully removed {} from your contacts", target.trim()),
                ListKind::Block => format!("Successfully unblocked {}", target.trim()),
            };
            self.console.line(done)?;
        }
        Ok(())
    }

    fn write_new_message(&mut self, session: &Session) -> Result<()> {
        let Some(chat) = self.pick_joined(session, "Which chat would you like to write to? Press 0 to go back!")? else {
            return Ok(());
        };
        self.add_message(session, chat.chat.id)
    }

    /// Returns true when the account is gone and the session has ended.
    fn delete_account(&mut self, session: &Session) -> Result<bool> {
        let answer = self
            .console
            .prompt("Are you sure you want to delete your account? (Y/N): ")?;
        match answer.trim() {
            "Y" | "y" => match self.outcome(accounts::delete_account(self.db, session))? {
                Some(AccountDeletion::Deleted) => {
                    self.console.line("Your account was deleted.")?;
                    Ok(true)
                }
                Some(AccountDeletion::Refused) => {
                    self.console
                        .line("Your account is the owner of a chat and cannot be deleted.")?;
                    Ok(false)
                }
                None => Ok(false),
            },
            "N" | "n" => Ok(false),
            _ => {
                self.console
                    .line("Invalid option. Your account will not be deleted.")?;
                Ok(false)
            }
        }
    }

    // -- Chats --

    fn chat_menu(&mut self, session: Session) -> Result<Screen> {
        self.console.line("\nCHAT MENU")?;
        self.console.line(RULE)?;
        self.console.line("1. Message Options")?;
        self.console.line("2. Add Member to Chat")?;
        self.console.line("3. Delete Member from Chat")?;
        self.console.line("4. Create new Chat")?;
        self.console.line("5. Delete Whole Chat")?;
        self.console.line(".........................")?;
        self.console.line("0. Previous Menu")?;

        match self.console.read_choice()? {
            0 => return Ok(Screen::User(session)),
            1 => return Ok(Screen::ChatPicker(session)),
            2 => self.add_chat_member(&session)?,
            3 => self.remove_chat_member(&session)?,
            4 => self.create_chat(&session)?,
            5 => self.delete_chat(&session)?,
            _ => return self.unrecognized(Screen::Chats(session)),
        }
        Ok(Screen::Chats(session))
    }

    fn chat_picker(&mut self, session: Session) -> Result<Screen> {
        let question = "Which chat would you like to access? Press 0 to go back!";
        match self.pick_joined(&session, question)? {
            Some(chat) => Ok(Screen::Messages {
                session,
                chat_id: chat.chat.id,
                window: MessageWindow::default(),
            }),
            None => Ok(Screen::Chats(session)),
        }
    }

    fn create_chat(&mut self, session: &Session) -> Result<()> {
        self.console
            .line("Enter users to chat with. Type 'DONE' when done.")?;
        let mut invitees = Vec::new();
        loop {
            let login = self
                .console
                .prompt(format!("\tEnter user {}: ", invitees.len() + 1))?;
            let login = login.trim();
            if login.is_empty() || login == "DONE" {
                break;
            }
            invitees.push(login.to_string());
        }

        if let Some(chat) = self.outcome(chats::create(self.db, session, &invitees))? {
            self.console
                .line(format!("Created {} chat {}.", chat.kind, chat.id))?;
        }
        Ok(())
    }

    /// Stays on the listing until the user goes back.
    fn add_chat_member(&mut self, session: &Session) -> Result<()> {
        let question = "To which chat would you like to add a member? Press 0 to go back!";
        while let Some(chat) = self.pick_managed(session, question)? {
            let member = self.console.prompt("Enter New Member Name.\n")?;
            if self
                .outcome(chats::add_member(self.db, session, chat.chat.id, &member))?
                .is_some()
            {
                self.console
                    .line(format!("Added {} to chat {}.", member.trim(), chat.chat.id))?;
            }
        }
        Ok(())
    }

    fn remove_chat_member(&mut self, session: &Session) -> Result<()> {
        let question = "To which chat would you like to delete a member? Press 0 to go back!";
        while let Some(chat) = self.pick_managed(session, question)? {
            let member = self.console.prompt("Enter Member Name.\n")?;
            if self
                .outcome(chats::remove_member(self.db, session, chat.chat.id, &member))?
                .is_some()
            {
                self.console
                    .line(format!("Removed {} from chat {}.", member.trim(), chat.chat.id))?;
            }
        }
        Ok(())
    }

    fn delete_chat(&mut self, session: &Session) -> Result<()> {
        let question = "Which chat would you like to delete? Press 0 to go back!";
        while let Some(chat) = self.pick_managed(session, question)? {
            if self
                .outcome(chats::delete(self.db, session, chat.chat.id))?
                .is_some()
            {
                self.console.line(format!("Deleted chat {}.", chat.chat.id))?;
            }
        }
        Ok(())
    }

    /// "YOUR CHATS": every chat the user is in. The listing is shown again
    /// after an unrecognized choice.
    fn pick_joined(&mut self, session: &Session, question: &str) -> Result<Option<ChatSummary>> {
        loop {
            let Some(mut joined) = self.outcome(chats::joined(self.db, session))? else {
                return Ok(None);
            };

            self.console.line("\nYOUR CHATS")?;
            self.console.line("----------")?;
            if joined.is_empty() {
                self.console.line("You are not in any chats yet.")?;
                return Ok(None);
            }
            for (i, summary) in joined.iter().enumerate() {
                self.console
                    .line(format!("{}. Chat Started By {}", i + 1, summary.chat.initiator))?;
            }

            match self.console.pick(joined.len(), question)? {
                Pick::Back => return Ok(None),
                Pick::Entry(idx) => return Ok(Some(joined.swap_remove(idx))),
                Pick::Unrecognized => {}
            }
        }
    }

    /// "MANAGEABLE CHATS": chats the user initiated, with their members.
    fn pick_managed(&mut self, session: &Session, question: &str) -> Result<Option<ChatSummary>> {
        loop {
            let Some(mut managed) = self.outcome(chats::managed(self.db, session))? else {
                return Ok(None);
            };

            self.console.line("\nMANAGEABLE CHATS")?;
            self.console.line("-------------------")?;
            if managed.is_empty() {
                self.console.line("You Are Not The Leader of Any Chats!")?;
                return Ok(None);
            }
            for (i, summary) in managed.iter().enumerate() {
                self.console
                    .line(format!("{}. Chat By: {}", i + 1, summary.chat.initiator))?;
                self.console.line("With:")?;
                for member in &summary.members {
                    self.console.line(member)?;
                }
                self.console.line("----------------------------")?;
            }

            match self.console.pick(managed.len(), question)? {
                Pick::Back => return Ok(None),
                Pick::Entry(idx) => return Ok(Some(managed.swap_remove(idx))),
                Pick::Unrecognized => {}
            }
        }
    }

    // -- Messages --

    fn message_menu(&mut self, session: Session, chat_id: i64, mut window: MessageWindow) -> Result<Screen> {
        self.console.line("\nMessage Menu")?;
        self.console.line("-------------")?;
        self.console.line("1. Add Message")?;
        self.console.line("2. Edit Message")?;
        self.console.line("3. Delete Message")?;
        self.console.line("4. Display Chat Messages")?;
        self.console.line("5. Load More Chat Messages")?;
        self.console.line(".........................")?;
        self.console.line("0. Previous Menu")?;

        match self.console.read_choice()? {
            0 => return Ok(Screen::ChatPicker(session)),
            1 => self.add_message(&session, chat_id)?,
            2 => self.edit_message(&session, chat_id, window)?,
            3 => self.delete_message(&session, chat_id, window)?,
            4 => self.display_messages(&session, chat_id, window)?,
            5 => {
                let old = window.limit();
                let new = window.load_more();
                self.console.line(format!("Current Message Limit: {}", old))?;
                self.console.line(format!("New Limit: {}", new))?;
            }
            _ => self.console.line("Unrecognized choice!")?,
        }
        Ok(Screen::Messages {
            session,
            chat_id,
            window,
        })
    }

    fn add_message(&mut self, session: &Session, chat_id: i64) -> Result<()> {
        let text = self.console.prompt("Enter Message.\n")?;
        if self
            .outcome(messages::send(self.db, session, chat_id, &text))?
            .is_some()
        {
            self.console.line("Message sent.")?;
        }
        Ok(())
    }

    fn display_messages(&mut self, session: &Session, chat_id: i64, window: MessageWindow) -> Result<()> {
        let Some(recent) = self.outcome(messages::recent(self.db, session, chat_id, window.limit()))? else {
            return Ok(());
        };
        if recent.is_empty() {
            self.console.line("No messages yet.")?;
        }
        for msg in recent {
            self.console.line(format!("By: {}", msg.sender))?;
            self.console.line(format!("On: {}", msg.sent_at.format(TIME_FORMAT)))?;
            self.console.line("MESSAGE")?;
            self.console.line(&msg.text)?;
        }
        Ok(())
    }

    fn edit_message(&mut self, session: &Session, chat_id: i64, window: MessageWindow) -> Result<()> {
        let question = "Which message would you like to edit? Press 0 to go back!";
        while let Some(msg) = self.pick_own_message(session, chat_id, window, question)? {
            let text = self.console.prompt("Enter New Message.\n")?;
            if self
                .outcome(messages::edit(self.db, session, msg.id, &text))?
                .is_some()
            {
                self.console.line("Message updated.")?;
            }
        }
        Ok(())
    }

    fn delete_message(&mut self, session: &Session, chat_id: i64, window: MessageWindow) -> Result<()> {
        let question = "Which message would you like to delete? Press 0 to go back!";
        while let Some(msg) = self.pick_own_message(session, chat_id, window, question)? {
            if self
                .outcome(messages::delete(self.db, session, msg.id))?
                .is_some()
            {
                self.console.line("Message deleted.")?;
            }
        }
        Ok(())
    }

    fn pick_own_message(
        &mut self,
        session: &Session,
        chat_id: i64,
        window: MessageWindow,
        question: &str,
    ) -> Result<Option<Message>> {
        loop {
            let Some(mut own) =
                self.outcome(messages::recent_own(self.db, session, chat_id, window.limit()))?
            else {
                return Ok(None);
            };

            self.console.line("\nYOUR MESSAGES")?;
            self.console.line("----------")?;
            if own.is_empty() {
                self.console.line("You Have No Messages!")?;
                return Ok(None);
            }
            for (i, msg) in own.iter().enumerate() {
                self.console
                    .line(format!("{}. On: {}", i + 1, msg.sent_at.format(TIME_FORMAT)))?;
                self.console.line(format!("{}. Message: {}", i + 1, msg.text))?;
            }

            match self.console.pick(own.len(), question)? {
                Pick::Back => return Ok(None),
                Pick::Entry(idx) => return Ok(Some(own.swap_remove(idx))),
                Pick::Unrecognized => {}
            }
        }
    }

    // -- Helpers --

    fn unrecognized(&mut self, stay: Screen) -> Result<Screen> {
        self.console.line("Unrecognized choice!")?;
        Ok(stay)
    }

    /// Prints a failed operation and carries on; a lost connection ends the run.
    fn outcome<T>(&mut self, result: messenger_api::Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                match &err {
                    MessengerError::Database(_) => error!(error = %err, "statement failed"),
                    _ => debug!(error = %err, "operation rejected"),
                }
                self.console.line(&err)?;
                Ok(None)
            }
        }
    }
}
