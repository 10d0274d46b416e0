use anyhow::{Context, Result};
use simple_logger::SimpleLogger;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use teller::store::{
    Amount, DirStorage, Ledger, MINIMUM_INITIAL_DEPOSIT, Profile, Storage, StoreError,
};

fn main() -> Result<()> {
    SimpleLogger::new().env().init()?;

    log::debug!("Application started");

    let data_dir = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    log::debug!("Using data directory: {data_dir:?}");

    let mut ledger = Ledger::open(DirStorage::new(data_dir))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    run(&mut ledger, &mut input)?;

    log::debug!("Application finished");

    Ok(())
}

fn run<S: Storage>(ledger: &mut Ledger<S>, input: &mut impl BufRead) -> Result<()> {
    loop {
        let Some(choice) = menu(input, &["Login", "Sign Up", "Exit"])? else {
            return Ok(());
        };
        let user_name = match choice {
            1 => login(ledger, input)?,
            2 => sign_up(ledger, input)?,
            _ => return Ok(()),
        };
        if let Some(user_name) = user_name {
            if !session(ledger, input, user_name)? {
                return Ok(());
            }
        }
    }
}

/// One logged-in session. Returns false once the user wants the program to
/// exit rather than return to the access menu.
fn session<S: Storage>(
    ledger: &mut Ledger<S>,
    input: &mut impl BufRead,
    mut user_name: String,
) -> Result<bool> {
    println!("\nWelcome, {user_name}!");
    loop {
        let Some(choice) = menu(
            input,
            &[
                "Account Information",
                "Personal Information",
                "Edit Personal Information",
                "Transaction History",
                "Transfer Money",
                "Deposit Money",
                "Withdraw Money",
                "Log Out",
            ],
        )?
        else {
            return Ok(false);
        };

        let account_id = match ledger.user(&user_name) {
            Some(user) => user.account_id(),
            None => {
                println!("Session user no longer exists; logging out.");
                return Ok(true);
            }
        };

        let outcome = match choice {
            1 => show_account(ledger, account_id),
            2 => show_personal(ledger, &user_name),
            3 => edit_personal(ledger, input, &mut user_name)?,
            4 => show_history(ledger, account_id),
            5 => transfer(ledger, input, account_id)?,
            6 => deposit(ledger, input, account_id)?,
            7 => withdraw(ledger, input, account_id)?,
            _ => {
                println!("You have been logged out.");
                return Ok(true);
            }
        };
        if let Err(e) = outcome {
            println!("ERROR: {e}");
        }

        let Some(exit_choice) = menu(input, &["Return to Main Menu", "Exit Program"])? else {
            return Ok(false);
        };
        if exit_choice == 2 {
            return Ok(false);
        }
    }
}

fn login<S: Storage>(ledger: &Ledger<S>, input: &mut impl BufRead) -> Result<Option<String>> {
    loop {
        let Some(user_name) = prompt(input, "\nEnter User Name: ")? else {
            return Ok(None);
        };
        let Some(password) = prompt(input, "Enter Password: ")? else {
            return Ok(None);
        };

        match ledger.login(&user_name, &password) {
            Ok(user) => {
                log::debug!("login succeeded for {:?}", user.user_name());
                return Ok(Some(user_name));
            }
            Err(e) => println!("{e}. Try again."),
        }
    }
}

fn sign_up<S: Storage>(ledger: &mut Ledger<S>, input: &mut impl BufRead) -> Result<Option<String>> {
    let user_name = loop {
        let Some(user_name) = prompt(input, "\nEnter User Name: ")? else {
            return Ok(None);
        };
        if ledger.user(&user_name).is_some() {
            println!("Username already in use. Try again.");
            continue;
        }
        if user_name.is_empty() {
            println!("Username cannot be empty. Try again.");
            continue;
        }
        break user_name;
    };

    let Some(password) = read_new_password(input)? else {
        return Ok(None);
    };
    let Some(first_name) = prompt(input, "Enter First Name: ")? else {
        return Ok(None);
    };
    let Some(last_name) = prompt(input, "Enter Last Name: ")? else {
        return Ok(None);
    };
    let Some(email) = prompt(input, "Enter Email: ")? else {
        return Ok(None);
    };

    println!("\nTo open an account, you need to deposit at least ${MINIMUM_INITIAL_DEPOSIT}");
    loop {
        let Some(initial_deposit) = read_amount(input, "Enter the initial deposit amount: $")?
        else {
            return Ok(None);
        };
        let profile = Profile {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            email: email.clone(),
            password: password.clone(),
        };
        match ledger.sign_up(&user_name, profile, initial_deposit) {
            Ok(account_id) => {
                println!("\nWelcome! Your account number is {account_id}.");
                return Ok(Some(user_name));
            }
            Err(e @ StoreError::InsufficientInitialDeposit { .. }) => {
                println!("{e}. Try again.");
            }
            Err(e) => {
                println!("ERROR: {e}");
                return Ok(None);
            }
        }
    }
}

fn show_account<S: Storage>(ledger: &Ledger<S>, account_id: u32) -> Result<(), StoreError> {
    let account = ledger
        .account(account_id)
        .ok_or(StoreError::StoreCorrupt(account_id))?;
    println!("\n-> Account ID: {}", account.id());
    println!("-> Account Balance: ${}", account.balance());
    Ok(())
}

fn show_personal<S: Storage>(ledger: &Ledger<S>, user_name: &str) -> Result<(), StoreError> {
    let user = ledger
        .user(user_name)
        .ok_or_else(|| StoreError::UnknownRecipient(user_name.to_owned()))?;
    println!("\n{user}");
    println!("User Name: {}", user.user_name());
    println!("Account Number: {}", user.account_id());
    Ok(())
}

fn show_history<S: Storage>(ledger: &Ledger<S>, account_id: u32) -> Result<(), StoreError> {
    let account = ledger
        .account(account_id)
        .ok_or(StoreError::StoreCorrupt(account_id))?;
    if account.history().is_empty() {
        println!("\nTransaction history is empty.");
        return Ok(());
    }
    println!("\nTransaction History:");
    for entry in account.history() {
        println!(
            "  {} ${} - Balance: ${}  {}  {}",
            entry.kind, entry.amount, entry.resulting_balance, entry.message, entry.timestamp
        );
    }
    Ok(())
}

fn edit_personal<S: Storage>(
    ledger: &mut Ledger<S>,
    input: &mut impl BufRead,
    user_name: &mut String,
) -> Result<Result<(), StoreError>> {
    let Some(choice) = menu(
        input,
        &["First Name", "Last Name", "Email", "User Name", "Password"],
    )?
    else {
        return Ok(Ok(()));
    };

    let outcome = match choice {
        1 => match prompt(input, "\nEnter your new First Name: ")? {
            Some(first_name) => ledger.change_first_name(user_name, &first_name),
            None => Ok(()),
        },
        2 => match prompt(input, "\nEnter your new Last Name: ")? {
            Some(last_name) => ledger.change_last_name(user_name, &last_name),
            None => Ok(()),
        },
        3 => match prompt(input, "\nEnter your new Email: ")? {
            Some(email) => ledger.change_email(user_name, &email),
            None => Ok(()),
        },
        4 => match prompt(input, "\nEnter your new User Name: ")? {
            Some(new_user_name) => match ledger.rename_user(user_name, &new_user_name) {
                Ok(()) => {
                    *user_name = new_user_name;
                    println!("Username updated successfully.");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            None => Ok(()),
        },
        _ => change_password(ledger, input, user_name)?,
    };
    Ok(outcome)
}

fn change_password<S: Storage>(
    ledger: &mut Ledger<S>,
    input: &mut impl BufRead,
    user_name: &str,
) -> Result<Result<(), StoreError>> {
    loop {
        let Some(current) = prompt(input, "\nEnter your current password: ")? else {
            return Ok(Ok(()));
        };
        let Some(new_password) = read_new_password(input)? else {
            return Ok(Ok(()));
        };
        match ledger.change_password(user_name, &current, &new_password) {
            Ok(()) => {
                println!("Password updated successfully.");
                return Ok(Ok(()));
            }
            Err(StoreError::InvalidCredentials) => {
                println!("Incorrect current password.");
                let Some(retry) = menu(input, &["Try Again", "Give Up"])? else {
                    return Ok(Ok(()));
                };
                if retry == 2 {
                    return Ok(Ok(()));
                }
            }
            Err(e) => return Ok(Err(e)),
        }
    }
}

fn transfer<S: Storage>(
    ledger: &mut Ledger<S>,
    input: &mut impl BufRead,
    account_id: u32,
) -> Result<Result<(), StoreError>> {
    let Some(amount) = read_amount(input, "\nEnter the amount to transfer: $")? else {
        return Ok(Ok(()));
    };
    let Some(receiver) = prompt(input, "To user: ")? else {
        return Ok(Ok(()));
    };
    Ok(ledger.transfer(account_id, &receiver, amount).map(|balance| {
        println!("${amount} has been sent to {receiver}. Your balance is now ${balance}.");
    }))
}

fn deposit<S: Storage>(
    ledger: &mut Ledger<S>,
    input: &mut impl BufRead,
    account_id: u32,
) -> Result<Result<(), StoreError>> {
    let Some(amount) = read_amount(input, "\nEnter the amount to deposit: $")? else {
        return Ok(Ok(()));
    };
    Ok(ledger.deposit(account_id, amount).map(|balance| {
        println!("${amount} has been added to your account. Your balance is now ${balance}.");
    }))
}

fn withdraw<S: Storage>(
    ledger: &mut Ledger<S>,
    input: &mut impl BufRead,
    account_id: u32,
) -> Result<Result<(), StoreError>> {
    let Some(amount) = read_amount(input, "\nEnter the amount to withdraw: $")? else {
        return Ok(Ok(()));
    };
    Ok(ledger.withdraw(account_id, amount).map(|balance| {
        println!("${amount} has been withdrawn. Your balance is now ${balance}.");
    }))
}

/// Prints the numbered options and reads a choice, retrying until the input
/// is a number in range. `None` means the input stream ended.
fn menu(input: &mut impl BufRead, options: &[&str]) -> Result<Option<usize>> {
    println!("\nMenu:");
    for (i, option) in options.iter().enumerate() {
        println!("\t{}) {}", i + 1, option);
    }
    loop {
        let text = format!("\nEnter a number in the range 1 - {}: ", options.len());
        let Some(line) = prompt(input, &text)? else {
            return Ok(None);
        };
        match line.parse::<usize>() {
            Ok(choice) if (1..=options.len()).contains(&choice) => return Ok(Some(choice)),
            _ => println!("ERROR: Invalid input. Please enter a valid number."),
        }
    }
}

fn read_amount(input: &mut impl BufRead, text: &str) -> Result<Option<Amount>> {
    loop {
        let Some(line) = prompt(input, text)? else {
            return Ok(None);
        };
        match line.parse::<Amount>() {
            Ok(amount) => return Ok(Some(amount)),
            Err(e) => println!("ERROR: {e}. Try again."),
        }
    }
}

fn read_new_password(input: &mut impl BufRead) -> Result<Option<String>> {
    loop {
        let Some(password) = prompt(
            input,
            "\nEnter your password (at least 8 characters with a number,\n\
             a special character, and an uppercase letter): ",
        )?
        else {
            return Ok(None);
        };
        if !password_is_strong(&password) {
            println!("Invalid password format. Please try again.");
            continue;
        }
        let Some(confirmation) = prompt(input, "Confirm your password: ")? else {
            return Ok(None);
        };
        if password == confirmation {
            return Ok(Some(password));
        }
        println!("Passwords do not match. Please try again.");
    }
}

/// At least 8 characters with a digit, a letter, an uppercase letter and a
/// special character. Strength is a front-door concern; the ledger itself
/// accepts any password.
fn password_is_strong(password: &str) -> bool {
    if password.chars().count() < 8 {
        return false;
    }
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());
    has_digit && has_letter && has_uppercase && has_special
}

/// Reads one trimmed line, `None` on end of input.
fn prompt(input: &mut impl BufRead, text: &str) -> Result<Option<String>> {
    print!("{text}");
    io::stdout().flush().context("flushing prompt")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("reading input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}
