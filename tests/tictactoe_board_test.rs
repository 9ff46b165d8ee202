//! Tests for the tic-tac-toe board and outcome evaluator.

use ao_tictactoe::{
    Board, BoardError, Position, Symbol, check_winner, is_draw, is_full, winning_line,
};

fn board(cells: &str) -> Board {
    let mut symbols = [None; 9];
    for (i, c) in cells.chars().filter(|c| !c.is_whitespace()).enumerate() {
        symbols[i] = match c {
            'X' => Some(Symbol::X),
            'O' => Some(Symbol::O),
            _ => None,
        };
    }
    Board::from_symbols(symbols)
}

#[test]
fn test_position_wire_numbers() {
    assert_eq!(Position::TopLeft.to_wire(), 1);
    assert_eq!(Position::Center.to_wire(), 5);
    assert_eq!(Position::BottomRight.to_wire(), 9);
    assert_eq!(Position::from_wire("7"), Some(Position::BottomLeft));
    assert_eq!(Position::from_wire("0"), None);
    assert_eq!(Position::from_wire("10"), None);
}

#[test]
fn test_position_from_index() {
    assert_eq!(Position::from_index(0), Some(Position::TopLeft));
    assert_eq!(Position::from_index(4), Some(Position::Center));
    assert_eq!(Position::from_index(9), None);
}

#[test]
fn test_claim_rejects_occupied() {
    let mut board = Board::new();
    board.claim(Position::Center, Symbol::X).unwrap();
    assert_eq!(
        board.claim(Position::Center, Symbol::O),
        Err(BoardError::Occupied(Position::Center))
    );
    assert_eq!(board.occupied(), 1);
}

#[test]
fn test_column_win() {
    let b = board("X O . X O . X . .");
    assert_eq!(check_winner(&b), Some(Symbol::X));
    let line = winning_line(&b).unwrap();
    assert_eq!(
        line.positions,
        [Position::TopLeft, Position::MiddleLeft, Position::BottomLeft]
    );
}

#[test]
fn test_diagonal_win() {
    let b = board("O X X . O X . . O");
    assert_eq!(check_winner(&b), Some(Symbol::O));
}

#[test]
fn test_full_board_without_line_is_draw() {
    let b = board("X O X X O O O X X");
    assert!(is_full(&b));
    assert_eq!(check_winner(&b), None);
    assert!(is_draw(&b));
}

#[test]
fn test_full_board_with_line_is_not_draw() {
    let b = board("X X X O O X O X O");
    assert!(is_full(&b));
    assert!(!is_draw(&b));
}

#[test]
fn test_in_progress() {
    let b = board("X . . . O . . . .");
    assert_eq!(check_winner(&b), None);
    assert!(!is_draw(&b));
}

#[test]
fn test_board_wire_format() {
    let b: Board = serde_json::from_str(r#"["X",null,"O",null,null,null,null,null,"X"]"#).unwrap();
    assert_eq!(b.get(Position::TopRight).symbol(), Some(Symbol::O));
    let json = serde_json::to_string(&b).unwrap();
    assert_eq!(json, r#"["X",null,"O",null,null,null,null,null,"X"]"#);
    assert!(serde_json::from_str::<Board>(r#"["X"]"#).is_err());
}
